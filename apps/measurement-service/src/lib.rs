//! # measurement-service: Granite Ledger Operations
//!
//! The facade callers use to measure slabs and keep measurement sheets.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Service Startup                                   │
//! │                                                                         │
//! │  1. init_tracing()                                                      │
//! │       └── RUST_LOG, else info with debug for granite crates             │
//! │                                                                         │
//! │  2. ServiceConfig::load()                                               │
//! │       └── GRANITE_* / REDIS_URL environment variables                   │
//! │                                                                         │
//! │  3. MeasurementService::from_config(&config)                            │
//! │       ├── Database::new()  → pool + migrations                          │
//! │       └── cache            → Redis │ in-memory │ disabled               │
//! │                                                                         │
//! │  4. Serve operations                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! measurement_service::init_tracing();
//!
//! let config = ServiceConfig::load()?;
//! let service = MeasurementService::from_config(&config).await?;
//!
//! let sheet = service.create_sheet("CUST-42", "granite_shops").await?;
//! let item = service
//!     .add_line_item(&sheet.id, LineItemInput::new(150.0, 146.0, SlabCategory::Polished))
//!     .await?;
//! assert_eq!(item.serial_number, 1);
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use service::{HealthReport, MeasurementService};

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=granite_db=trace` - Show trace for the database crate only
/// - Default: INFO, with debug for the granite crates
///
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,granite_db=debug,granite_cache=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
