//! Bucket to table routing.
//!
//! Rules, first match wins:
//! 1. Single-table mode: every bucket lives in `prefix + "resources"`, keyed
//!    by `(key, _bucketname)`.
//! 2. Buckets starting with `allows` share `prefix + "allows"`, keyed by
//!    `(key, _bucketname)`.
//! 3. Anything else gets a dedicated table `prefix + sanitize(bucket)` keyed
//!    by `key` alone.

use crate::config::DynamoDbConfig;
use crate::store::{ItemKey, KeySchema};

/// Shared table name suffix used in single-table mode.
pub const SINGLE_TABLE_NAME: &str = "resources";

/// Bucket name prefix of permission-grant buckets, and their shared table suffix.
pub const ALLOWS_PREFIX: &str = "allows";

/// Where a bucket's items live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRoute {
    /// Physical table name.
    pub table_name: String,
    /// Whether the bucket name is part of the item key.
    pub use_bucket_in_key: bool,
}

impl TableRoute {
    /// Key layout of the routed table.
    pub fn key_schema(&self) -> KeySchema {
        if self.use_bucket_in_key {
            KeySchema::Composite
        } else {
            KeySchema::Simple
        }
    }

    /// Item key for an encoded `key` in `bucket`.
    pub fn item_key(&self, bucket: &str, key: String) -> ItemKey {
        if self.use_bucket_in_key {
            ItemKey::composite(key, bucket)
        } else {
            ItemKey::simple(key)
        }
    }
}

/// Resolve the table for `bucket`.
pub fn route(config: &DynamoDbConfig, bucket: &str) -> TableRoute {
    let table_route = if config.single_table {
        TableRoute {
            table_name: format!("{}{SINGLE_TABLE_NAME}", config.prefix),
            use_bucket_in_key: true,
        }
    } else if bucket.starts_with(ALLOWS_PREFIX) {
        TableRoute {
            table_name: format!("{}{ALLOWS_PREFIX}", config.prefix),
            use_bucket_in_key: true,
        }
    } else {
        TableRoute {
            table_name: format!("{}{}", config.prefix, sanitize_table_name(bucket)),
            use_bucket_in_key: false,
        }
    };
    log::debug!(
        "Bucket '{bucket}' -> table '{}' (bucket in key: {})",
        table_route.table_name,
        table_route.use_bucket_in_key
    );
    table_route
}

/// Strip every character outside `[A-Za-z0-9_.-]`.
///
/// # Examples
///
/// ```
/// use fabryk_acl_dynamodb::router::sanitize_table_name;
///
/// assert_eq!(sanitize_table_name("meta@users"), "metausers");
/// assert_eq!(sanitize_table_name("roles_v2.backup-1"), "roles_v2.backup-1");
/// ```
pub fn sanitize_table_name(bucket: &str) -> String {
    bucket
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
