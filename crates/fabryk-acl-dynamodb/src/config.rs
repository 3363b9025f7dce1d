//! Backend configuration.
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! prefix = "acl_"
//! single_table = false
//! read_capacity_units = 5
//! write_capacity_units = 5
//! retry_base_delay_ms = 1000
//! # max_batch_retries = 8
//! ```

use fabryk_acl::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::backoff::QuadraticBackoffBuilder;

/// Configuration for [`DynamoDbBackend`](crate::DynamoDbBackend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamoDbConfig {
    /// Prepended to every physical table name.
    #[serde(default)]
    pub prefix: String,

    /// Fold every bucket into one shared table.
    #[serde(default)]
    pub single_table: bool,

    /// Provisioned read capacity for created tables.
    #[serde(default = "default_capacity_units")]
    pub read_capacity_units: i64,

    /// Provisioned write capacity for created tables.
    #[serde(default = "default_capacity_units")]
    pub write_capacity_units: i64,

    /// Batch-read backoff unit; retry `n` waits `n² ×` this many milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Give up on a batch read after this many retries. Unbounded if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_retries: Option<u32>,
}

fn default_capacity_units() -> i64 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            single_table: false,
            read_capacity_units: default_capacity_units(),
            write_capacity_units: default_capacity_units(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_batch_retries: None,
        }
    }
}

impl DynamoDbConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse backend config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loaded backend config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Check values that would make the backend unusable.
    pub fn validate(&self) -> Result<()> {
        if self.read_capacity_units <= 0 || self.write_capacity_units <= 0 {
            return Err(Error::config("capacity units must be positive"));
        }
        if self.retry_base_delay_ms == 0 {
            return Err(Error::config("retry_base_delay_ms must be positive"));
        }
        Ok(())
    }

    /// Set the table name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable or disable single-table mode.
    pub fn with_single_table(mut self, single_table: bool) -> Self {
        self.single_table = single_table;
        self
    }

    /// Set the provisioned capacity hints.
    pub fn with_capacity(mut self, read: i64, write: i64) -> Self {
        self.read_capacity_units = read;
        self.write_capacity_units = write;
        self
    }

    /// Set the batch-read backoff unit.
    pub fn with_retry_base_delay(mut self, unit: Duration) -> Self {
        self.retry_base_delay_ms = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Cap batch-read retries (`None` keeps them unbounded).
    pub fn with_max_batch_retries(mut self, max: Option<u32>) -> Self {
        self.max_batch_retries = max;
        self
    }

    /// Backoff schedule for batch reads.
    pub fn backoff(&self) -> QuadraticBackoffBuilder {
        QuadraticBackoffBuilder::new(Duration::from_millis(self.retry_base_delay_ms))
            .with_max_times(self.max_batch_retries)
    }
}

// ============================================================================
// Tests
// ============================================================================
