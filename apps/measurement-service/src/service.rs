//! # Measurement Service
//!
//! The operations callers use. Each one runs the same pipeline:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mutation Pipeline                                │
//! │                                                                         │
//! │  raw input                                                              │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  validate (granite-core) ── violations? ──► VALIDATION_ERROR           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  strategy_for(sheet.customer_type).compute()                            │
//! │     │   anomalies ──► warn!, area treated as 0 for that dimension      │
//! │     ▼                                                                   │
//! │  granite-db: ONE transaction                                            │
//! │     lock sheet row → serial = MAX+1 → INSERT → total_area → COMMIT     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  granite-cache: invalidate(Mutation)    (never fails the caller)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go through [`CacheCoordinator::get_or_load`]; misses load from
//! SQLite and fill the cache. Lookups that find nothing are not cached.

use std::sync::Arc;

use granite_cache::{CacheCoordinator, CacheKey, CacheStore, MemoryStore, Mutation, RedisStore};
use granite_core::validation::{self, ValidatedLineItem};
use granite_core::{
    strategy_for, CalculationResult, CustomerType, LineItemInput, MeasurementSheet, SheetQuery,
    SheetStatistics, SheetWithItems, SlabLineItem, ValidationError, ValidationFailed,
};
use granite_db::{Database, NewLineItem, RenumberPolicy};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Health
// =============================================================================

/// Result of [`MeasurementService::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// The database answered `SELECT 1`.
    pub database: bool,
    /// The cache backend answered a ping.
    pub cache: bool,
    pub cache_backend: &'static str,
}

impl HealthReport {
    /// Serving is possible as long as the database is up; a dead cache only
    /// costs latency.
    pub fn is_serving(&self) -> bool {
        self.database
    }
}

// =============================================================================
// Service
// =============================================================================

/// Facade over calculation, persistence and caching.
///
/// Cheap to clone; clones share the pool and the cache.
#[derive(Debug, Clone)]
pub struct MeasurementService {
    db: Database,
    cache: CacheCoordinator,
    delete_policy: RenumberPolicy,
}

impl MeasurementService {
    /// Creates a service over an open database and a cache.
    pub fn new(db: Database, cache: CacheCoordinator) -> Self {
        MeasurementService {
            db,
            cache,
            delete_policy: RenumberPolicy::default(),
        }
    }

    /// Sets how serials are treated after a line item is deleted.
    pub fn with_delete_policy(mut self, policy: RenumberPolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Opens the database and the cache described by `config`.
    ///
    /// ## Cache Selection
    /// - `cache_enabled = false` → no caching at all
    /// - `redis_url` set and reachable → Redis
    /// - otherwise → in-process memory cache
    pub async fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let cache = build_cache(config).await;

        info!(
            database = %config.database_path,
            cache_backend = cache.backend(),
            delete_policy = ?config.delete_policy(),
            "Measurement service ready"
        );

        Ok(Self::new(db, cache).with_delete_policy(config.delete_policy()))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cache(&self) -> &CacheCoordinator {
        &self.cache
    }

    // =========================================================================
    // Calculation
    // =========================================================================

    /// Computes the billable area without persisting anything.
    ///
    /// Results are never cached.
    pub fn calculate(
        &self,
        length: f64,
        breadth: f64,
        customer_type: &str,
    ) -> ServiceResult<CalculationResult> {
        let result = granite_core::calculate(length, breadth, customer_type)?;
        log_anomalies(&result);
        Ok(result)
    }

    /// One-sentence description of a customer type's rule.
    pub fn describe_strategy(&self, customer_type: &str) -> ServiceResult<&'static str> {
        Ok(granite_core::describe_strategy(customer_type)?)
    }

    // =========================================================================
    // Sheets
    // =========================================================================

    /// Opens a new draft sheet with the next `MS-` number.
    pub async fn create_sheet(
        &self,
        customer_id: &str,
        customer_type: &str,
    ) -> ServiceResult<MeasurementSheet> {
        let mut violations = Vec::new();
        if customer_id.trim().is_empty() {
            violations.push(ValidationError::Required {
                field: "customer_id".to_string(),
            });
        }
        let customer_type = match validation::validate_customer_type(customer_type) {
            Ok(t) => Some(t),
            Err(failed) => {
                violations.extend(failed.violations);
                None
            }
        };

        let customer_type = match customer_type {
            Some(t) if violations.is_empty() => t,
            _ => return Err(ValidationFailed { violations }.into()),
        };

        let sheet = self.db.sheets().create(customer_id, customer_type).await?;
        self.cache
            .invalidate(&Mutation::SheetCreated {
                sheet_id: sheet.id.clone(),
            })
            .await;

        Ok(sheet)
    }

    /// Fetches a sheet (read-through cached).
    pub async fn get_sheet(&self, sheet_id: &str) -> ServiceResult<MeasurementSheet> {
        self.cache
            .get_or_load(&CacheKey::sheet(sheet_id), || self.load_sheet(sheet_id))
            .await
    }

    /// Fetches a sheet and its items in serial order (read-through cached).
    pub async fn get_sheet_with_items(&self, sheet_id: &str) -> ServiceResult<SheetWithItems> {
        self.cache
            .get_or_load(&CacheKey::sheet_full(sheet_id), || {
                self.load_sheet_with_items(sheet_id)
            })
            .await
    }

    /// Lists sheets matching `query`, newest first (read-through cached).
    pub async fn search_sheets(&self, query: &SheetQuery) -> ServiceResult<Vec<MeasurementSheet>> {
        self.cache
            .get_or_load(&CacheKey::sheet_list(query), || self.load_listing(query))
            .await
    }

    /// Totals across every sheet (read-through cached).
    pub async fn sheet_statistics(&self) -> ServiceResult<SheetStatistics> {
        self.cache
            .get_or_load(&CacheKey::SheetStats, || self.load_statistics())
            .await
    }

    /// Marks a sheet completed. Completing twice is harmless.
    pub async fn complete_sheet(&self, sheet_id: &str) -> ServiceResult<MeasurementSheet> {
        let sheet = self.db.sheets().complete(sheet_id).await?;
        self.invalidate_sheet(sheet_id).await;
        Ok(sheet)
    }

    /// Switches the customer type of a sheet that never had an item.
    pub async fn change_customer_type(
        &self,
        sheet_id: &str,
        customer_type: &str,
    ) -> ServiceResult<MeasurementSheet> {
        let customer_type = validation::validate_customer_type(customer_type)?;
        let sheet = self
            .db
            .sheets()
            .change_customer_type(sheet_id, customer_type)
            .await?;
        self.invalidate_sheet(sheet_id).await;
        Ok(sheet)
    }

    /// Deletes a sheet together with its line items.
    pub async fn delete_sheet(&self, sheet_id: &str) -> ServiceResult<()> {
        self.db.sheets().delete(sheet_id).await?;
        self.cache
            .invalidate(&Mutation::SheetDeleted {
                sheet_id: sheet_id.to_string(),
            })
            .await;
        Ok(())
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Validates, computes and appends one slab to a sheet.
    ///
    /// The area is computed under the sheet's customer type; the serial is
    /// allocated in the same transaction as the insert.
    pub async fn add_line_item(
        &self,
        sheet_id: &str,
        input: LineItemInput,
    ) -> ServiceResult<SlabLineItem> {
        let validated = validation::validate_line_item(&input)?;
        let sheet = self.load_sheet(sheet_id).await?;
        warn_if_completed(&sheet, "add_line_item");

        let item = compute_line_item(sheet.customer_type, validated)?;
        let stored = self.db.line_items().insert(sheet_id, item).await?;
        self.invalidate_items(sheet_id).await;

        Ok(stored)
    }

    /// Appends several slabs with consecutive serials, all or nothing.
    ///
    /// Every element is validated before anything is written; violations
    /// name the element, e.g. `items[2].length`.
    pub async fn batch_add_line_items(
        &self,
        sheet_id: &str,
        inputs: Vec<LineItemInput>,
    ) -> ServiceResult<Vec<SlabLineItem>> {
        let mut violations = Vec::new();
        let mut validated = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            match validation::validate_line_item(input) {
                Ok(item) => validated.push(item),
                Err(failed) => {
                    let prefix = format!("items[{index}].");
                    violations.extend(
                        failed
                            .violations
                            .into_iter()
                            .map(|v| v.with_field_prefix(&prefix)),
                    );
                }
            }
        }
        if !violations.is_empty() {
            return Err(ValidationFailed { violations }.into());
        }

        let sheet = self.load_sheet(sheet_id).await?;
        if validated.is_empty() {
            debug!(sheet_id, "Empty batch, nothing to add");
            return Ok(Vec::new());
        }
        warn_if_completed(&sheet, "batch_add_line_items");

        let items = validated
            .into_iter()
            .map(|item| compute_line_item(sheet.customer_type, item))
            .collect::<ServiceResult<Vec<_>>>()?;

        let stored = self.db.line_items().insert_batch(sheet_id, items).await?;
        self.invalidate_items(sheet_id).await;

        Ok(stored)
    }

    /// Re-measures an item. Its serial number does not change.
    pub async fn update_line_item(
        &self,
        item_id: &str,
        input: LineItemInput,
    ) -> ServiceResult<SlabLineItem> {
        let validated = validation::validate_line_item(&input)?;
        let existing = self
            .db
            .line_items()
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Line item", item_id))?;
        let sheet = self.load_sheet(&existing.sheet_id).await?;
        warn_if_completed(&sheet, "update_line_item");

        let item = compute_line_item(sheet.customer_type, validated)?;
        let updated = self.db.line_items().update(item_id, item).await?;
        self.invalidate_items(&updated.sheet_id).await;

        Ok(updated)
    }

    /// Removes an item and returns it as it was stored.
    ///
    /// With the default [`RenumberPolicy::Compact`] the remaining serials
    /// are closed up in the same transaction.
    pub async fn delete_line_item(&self, item_id: &str) -> ServiceResult<SlabLineItem> {
        let deleted = self
            .db
            .line_items()
            .delete(item_id, self.delete_policy)
            .await?;
        self.invalidate_items(&deleted.sheet_id).await;

        // The delete is committed; a failed lookup here only skips the warning.
        if let Ok(Some(sheet)) = self.db.sheets().find_by_id(&deleted.sheet_id).await {
            warn_if_completed(&sheet, "delete_line_item");
        }

        Ok(deleted)
    }

    /// Closes serial gaps left by deletes under [`RenumberPolicy::KeepGaps`].
    pub async fn renumber_line_items(&self, sheet_id: &str) -> ServiceResult<u64> {
        let moved = self.db.line_items().renumber(sheet_id).await?;
        if moved > 0 {
            self.invalidate_items(sheet_id).await;
        }
        Ok(moved)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Drops cached views of a customer after the external customer record
    /// changed.
    pub async fn customer_changed(&self, customer_id: &str) {
        self.cache
            .invalidate(&Mutation::CustomerUpdated {
                customer_id: customer_id.to_string(),
            })
            .await;
    }

    // =========================================================================
    // Health
    // =========================================================================

    pub async fn health_check(&self) -> HealthReport {
        let report = HealthReport {
            database: self.db.health_check().await,
            cache: self.cache.health_check().await,
            cache_backend: self.cache.backend(),
        };

        if !report.database {
            warn!("Database health check failed");
        }
        report
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    async fn load_sheet(&self, sheet_id: &str) -> ServiceResult<MeasurementSheet> {
        self.db
            .sheets()
            .find_by_id(sheet_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sheet", sheet_id))
    }

    async fn load_sheet_with_items(&self, sheet_id: &str) -> ServiceResult<SheetWithItems> {
        self.db
            .sheets()
            .find_with_items(sheet_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sheet", sheet_id))
    }

    async fn load_listing(&self, query: &SheetQuery) -> ServiceResult<Vec<MeasurementSheet>> {
        Ok(self.db.sheets().search(query).await?)
    }

    async fn load_statistics(&self) -> ServiceResult<SheetStatistics> {
        Ok(self.db.sheets().statistics().await?)
    }

    async fn invalidate_sheet(&self, sheet_id: &str) {
        self.cache
            .invalidate(&Mutation::SheetUpdated {
                sheet_id: sheet_id.to_string(),
            })
            .await;
    }

    async fn invalidate_items(&self, sheet_id: &str) {
        self.cache
            .invalidate(&Mutation::LineItemsChanged {
                sheet_id: sheet_id.to_string(),
            })
            .await;
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn build_cache(config: &ServiceConfig) -> CacheCoordinator {
    if !config.cache_enabled {
        info!("Cache disabled by configuration");
        return CacheCoordinator::disabled();
    }

    let store: Arc<dyn CacheStore> = match config.redis_url {
        Some(ref url) => match RedisStore::connect(url).await {
            Ok(store) => {
                info!("Connected to Redis");
                Arc::new(store)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, continuing with in-memory cache");
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    };

    CacheCoordinator::new(store, config.ttl_policy())
}

fn compute_line_item(
    customer_type: CustomerType,
    input: ValidatedLineItem,
) -> ServiceResult<NewLineItem> {
    let result = strategy_for(customer_type).compute(input.length, input.breadth)?;
    log_anomalies(&result);
    Ok(NewLineItem::from_calculation(input, &result))
}

fn log_anomalies(result: &CalculationResult) {
    for anomaly in &result.anomalies {
        warn!(
            customer_type = %result.customer_type,
            field = %anomaly.field,
            value = anomaly.value,
            reason = %anomaly.reason,
            "Computation anomaly, dimension treated as zero"
        );
    }
}

fn warn_if_completed(sheet: &MeasurementSheet, operation: &str) {
    if sheet.is_completed() {
        warn!(
            sheet_id = %sheet.id,
            sheet_number = %sheet.sheet_number,
            operation,
            "Editing a completed sheet"
        );
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use granite_cache::TtlPolicy;
    use granite_core::SlabCategory;
    use granite_db::DbConfig;

    async fn service() -> (Arc<MemoryStore>, MeasurementService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = Arc::new(MemoryStore::new());
        let cache = CacheCoordinator::new(store.clone(), TtlPolicy::default());
        (store, MeasurementService::new(db, cache))
    }

    #[tokio::test]
    async fn test_calculate_is_pure() {
        let (store, svc) = service().await;

        let r = svc.calculate(150.0, 146.0, "outstation_parties").unwrap();
        assert_eq!((r.final_length, r.final_breadth, r.area), (147.0, 144.0, 147.0));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_describe_unknown_type() {
        let (_, svc) = service().await;

        let err = svc.describe_strategy("wholesale").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedCustomerType);
        assert!(!svc.describe_strategy("builders").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sheet_reports_every_violation() {
        let (_, svc) = service().await;

        let err = svc.create_sheet("  ", "wholesale").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.violations.len(), 2);
    }

    #[tokio::test]
    async fn test_get_sheet_fills_cache() {
        let (store, svc) = service().await;
        let sheet = svc.create_sheet("CUST-1", "retail").await.unwrap();

        let fetched = svc.get_sheet(&sheet.id).await.unwrap();
        assert_eq!(fetched.sheet_number, sheet.sheet_number);
        assert!(store.contains(&format!("sheet:{}", sheet.id)).await);
    }

    #[tokio::test]
    async fn test_missing_sheet_is_not_cached() {
        let (store, svc) = service().await;

        let err = svc.get_sheet("nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(!store.contains("sheet:nope").await);
    }

    #[tokio::test]
    async fn test_add_line_item_invalidates_cached_views() {
        let (store, svc) = service().await;
        let sheet = svc.create_sheet("CUST-1", "builders").await.unwrap();

        assert_eq!(svc.get_sheet(&sheet.id).await.unwrap().total_area, 0.0);
        svc.get_sheet_with_items(&sheet.id).await.unwrap();
        svc.search_sheets(&SheetQuery::default()).await.unwrap();
        svc.sheet_statistics().await.unwrap();

        let item = svc
            .add_line_item(&sheet.id, LineItemInput::new(150.0, 100.0, SlabCategory::Flamed))
            .await
            .unwrap();
        assert_eq!(item.serial_number, 1);
        assert_eq!(item.area, 102.08);

        assert!(!store.contains(&format!("sheet:{}", sheet.id)).await);
        assert!(!store.contains(&format!("sheet:{}:full", sheet.id)).await);
        assert!(!store.contains("sheets:stats").await);
        assert_eq!(svc.get_sheet(&sheet.id).await.unwrap().total_area, 102.08);

        let full = svc.get_sheet_with_items(&sheet.id).await.unwrap();
        assert_eq!(full.items.len(), 1);
        assert_eq!(svc.sheet_statistics().await.unwrap().total_line_items, 1);
    }

    #[tokio::test]
    async fn test_item_uses_sheet_customer_type() {
        let (_, svc) = service().await;
        let sheet = svc.create_sheet("CUST-2", "granite_shops").await.unwrap();

        let item = svc
            .add_line_item(&sheet.id, LineItemInput::new(149.0, 145.0, SlabCategory::Polished))
            .await
            .unwrap();
        assert_eq!((item.final_length, item.final_breadth, item.area), (144.0, 141.0, 141.0));
        assert!(!item.calculation_trail.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_missing_sheet() {
        let (_, svc) = service().await;

        let err = svc
            .add_line_item("missing", LineItemInput::new(10.0, 10.0, SlabCategory::Honed))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_batch_validation_names_elements() {
        let (_, svc) = service().await;
        let sheet = svc.create_sheet("CUST-3", "retail").await.unwrap();

        let inputs = vec![
            LineItemInput::new(10.0, 10.0, SlabCategory::Honed),
            LineItemInput {
                length: Some(-1.0),
                ..LineItemInput::new(10.0, 10.0, SlabCategory::Honed)
            },
        ];
        let err = svc.batch_add_line_items(&sheet.id, inputs).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.violations[0].field(), "items[1].length");

        // Nothing from the valid element was written
        let full = svc.get_sheet_with_items(&sheet.id).await.unwrap();
        assert!(full.items.is_empty());
    }

    #[tokio::test]
    async fn test_change_type_locked_after_first_item() {
        let (_, svc) = service().await;
        let sheet = svc.create_sheet("CUST-4", "retail").await.unwrap();

        let changed = svc.change_customer_type(&sheet.id, "exporters").await.unwrap();
        assert_eq!(changed.customer_type, CustomerType::Exporters);

        svc.add_line_item(&sheet.id, LineItemInput::new(3.0, 2.0, SlabCategory::Honed))
            .await
            .unwrap();
        let err = svc.change_customer_type(&sheet.id, "retail").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_, svc) = service().await;

        let report = svc.health_check().await;
        assert!(report.is_serving());
        assert!(report.cache);
        assert_eq!(report.cache_backend, "memory");
    }
}
