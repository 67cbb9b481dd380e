use crate::{
    error::{CatalogError, CatalogResult},
    metrics::HealthThresholds,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_LISTING_LIMIT: usize = 500;

pub const ENV_DATABASE_PATH: &str = "CATALOG_DATABASE_PATH";
pub const ENV_HISTORY_MODE: &str = "CATALOG_HISTORY_MODE";
pub const ENV_CACHE_TTL_SECS: &str = "CATALOG_CACHE_TTL_SECS";

/// How much price/cost history the catalog keeps.
///
/// `Temporal` is the append-only log in the `prices`/`costs` tables.
/// `SingleValue` is history depth 1: the `price`/`cost` columns on the
/// product row, valid forever, overwritten in place by each import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    #[default]
    Temporal,
    SingleValue,
}

impl FromStr for HistoryMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temporal" => Ok(Self::Temporal),
            "single_value" | "single-value" | "single" => Ok(Self::SingleValue),
            other => Err(CatalogError::Configuration(format!(
                "unknown history mode '{other}' (expected temporal or single_value)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite file. Absent means the catalog cannot start.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub history_mode: HistoryMode,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_listing_limit")]
    pub listing_limit: usize,
    #[serde(default)]
    pub thresholds: HealthThresholds,
    /// Bucket name handed to the blob collaborator; opaque to the core.
    #[serde(default = "default_blob_bucket")]
    pub blob_bucket: String,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_listing_limit() -> usize {
    DEFAULT_LISTING_LIMIT
}

fn default_blob_bucket() -> String {
    "photos".into()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            history_mode: HistoryMode::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            listing_limit: DEFAULT_LISTING_LIMIT,
            thresholds: HealthThresholds::default(),
            blob_bucket: default_blob_bucket(),
        }
    }
}

impl CatalogConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CatalogConfig = serde_json::from_str(&content)?;
        Ok(config.with_env_overrides()?)
    }

    /// Defaults plus environment only. Used when no config file is given.
    pub fn from_env() -> CatalogResult<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> CatalogResult<Self> {
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            if !path.trim().is_empty() {
                self.database_path = Some(path);
            }
        }
        if let Ok(mode) = std::env::var(ENV_HISTORY_MODE) {
            self.history_mode = mode.parse()?;
        }
        if let Ok(ttl) = std::env::var(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = ttl.trim().parse().map_err(|_| {
                CatalogError::Configuration(format!("{ENV_CACHE_TTL_SECS} must be an integer, got '{ttl}'"))
            })?;
        }
        self.cache_ttl()?;
        Ok(self)
    }

    /// The listing cache TTL. Values chrono cannot represent are a
    /// configuration error.
    pub fn cache_ttl(&self) -> CatalogResult<Duration> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                CatalogError::Configuration(format!(
                    "cache_ttl_secs out of range: {}",
                    self.cache_ttl_secs
                ))
            })
    }

    /// The database path, or a fatal configuration error when missing.
    pub fn require_database_path(&self) -> CatalogResult<&str> {
        match self.database_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(path),
            _ => Err(CatalogError::Configuration(format!(
                "database path missing: set {ENV_DATABASE_PATH} or database_path in the config file"
            ))),
        }
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self {
            database_path: Some(":memory:".into()),
            ..Self::default()
        }
    }

    pub fn with_history_mode(mut self, mode: HistoryMode) -> Self {
        self.history_mode = mode;
        self
    }
}
