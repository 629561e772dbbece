//! Service configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use granite_cache::TtlPolicy;
use granite_db::{DbConfig, RenumberPolicy};

/// Measurement service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// SQLite database file (`:memory:` for a throwaway database)
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// How long a writer waits on a locked sheet, in milliseconds
    pub db_busy_timeout_ms: u64,

    /// Redis connection string (optional, in-memory cache when absent)
    pub redis_url: Option<String>,

    /// Turn caching off entirely
    pub cache_enabled: bool,

    /// TTL for single sheets and customers
    pub cache_entity_ttl_secs: u64,

    /// TTL for a sheet with all its items
    pub cache_full_sheet_ttl_secs: u64,

    /// TTL for sheet listings
    pub cache_list_ttl_secs: u64,

    /// TTL for statistics
    pub cache_stats_ttl_secs: u64,

    /// Close serial gaps when an item is deleted
    pub renumber_on_delete: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: "./granite.db".to_string(),
            db_max_connections: 5,
            db_busy_timeout_ms: 5000,
            redis_url: None,
            cache_enabled: true,
            cache_entity_ttl_secs: 3600,
            cache_full_sheet_ttl_secs: 1800,
            cache_list_ttl_secs: 300,
            cache_stats_ttl_secs: 600,
            renumber_on_delete: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServiceConfig::default();

        let config = ServiceConfig {
            database_path: lookup("GRANITE_DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_var(
                &lookup,
                "GRANITE_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            db_busy_timeout_ms: parse_var(
                &lookup,
                "GRANITE_DB_BUSY_TIMEOUT_MS",
                defaults.db_busy_timeout_ms,
            )?,

            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),

            cache_enabled: parse_var(&lookup, "GRANITE_CACHE_ENABLED", defaults.cache_enabled)?,

            cache_entity_ttl_secs: parse_var(
                &lookup,
                "GRANITE_CACHE_ENTITY_TTL_SECS",
                defaults.cache_entity_ttl_secs,
            )?,

            cache_full_sheet_ttl_secs: parse_var(
                &lookup,
                "GRANITE_CACHE_FULL_SHEET_TTL_SECS",
                defaults.cache_full_sheet_ttl_secs,
            )?,

            cache_list_ttl_secs: parse_var(
                &lookup,
                "GRANITE_CACHE_LIST_TTL_SECS",
                defaults.cache_list_ttl_secs,
            )?,

            cache_stats_ttl_secs: parse_var(
                &lookup,
                "GRANITE_CACHE_STATS_TTL_SECS",
                defaults.cache_stats_ttl_secs,
            )?,

            renumber_on_delete: parse_var(
                &lookup,
                "GRANITE_RENUMBER_ON_DELETE",
                defaults.renumber_on_delete,
            )?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("GRANITE_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for [`granite_db::Database`].
    pub fn db_config(&self) -> DbConfig {
        if self.database_path == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_millis(self.db_busy_timeout_ms))
    }

    /// Cache expiry per key kind.
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::default()
            .entity(Duration::from_secs(self.cache_entity_ttl_secs))
            .full_sheet(Duration::from_secs(self.cache_full_sheet_ttl_secs))
            .listing(Duration::from_secs(self.cache_list_ttl_secs))
            .statistics(Duration::from_secs(self.cache_stats_ttl_secs))
    }

    /// What happens to serials after a delete.
    pub fn delete_policy(&self) -> RenumberPolicy {
        if self.renumber_on_delete {
            RenumberPolicy::Compact
        } else {
            RenumberPolicy::KeepGaps
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
