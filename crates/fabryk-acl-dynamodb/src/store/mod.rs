//! Key/value table store seam.
//!
//! [`TableStore`] is the narrow slice of a DynamoDB-style client the backend
//! consumes. Items are keyed by a `key` partition attribute, plus a
//! `_bucketname` range attribute when several buckets share a table. Every
//! other attribute is a field name set to `true`.
//!
//! # Implementations
//!
//! - [`MemoryTableStore`]: in-process store with fault injection, for tests
//!   and local development
//! - `DynamoDbStore`: adapter over `aws_sdk_dynamodb::Client` (requires the
//!   `aws-sdk` feature)

use async_trait::async_trait;
use fabryk_acl::{FieldSet, Result};
use std::collections::HashMap;
use std::fmt;

pub mod memory;
#[cfg(feature = "aws-sdk")]
pub mod sdk;

pub use memory::MemoryTableStore;
#[cfg(feature = "aws-sdk")]
pub use sdk::DynamoDbStore;

/// Partition key attribute name.
pub const KEY_ATTRIBUTE: &str = "key";

/// Range key attribute holding the bucket name in shared tables.
pub const BUCKET_ATTRIBUTE: &str = "_bucketname";

/// Legacy identifier attribute, never reported as a field.
pub const ID_ATTRIBUTE: &str = "_id";

/// Attributes that are never reported as fields.
pub const RESERVED_ATTRIBUTES: [&str; 3] = [KEY_ATTRIBUTE, ID_ATTRIBUTE, BUCKET_ATTRIBUTE];

/// Placeholder bound to `true` in SET expressions.
pub const TRUE_PLACEHOLDER: &str = ":trueVal";

/// Returns `true` if `name` is one of the item key attributes.
pub fn is_key_attribute(name: &str) -> bool {
    name == KEY_ATTRIBUTE || name == BUCKET_ATTRIBUTE
}

// ============================================================================
// Items and keys
// ============================================================================

/// Attribute value as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// String attribute (keys).
    S(String),
    /// Boolean attribute (field membership).
    Bool(bool),
}

/// A stored item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// Field names present on an item, reserved attributes excluded.
pub fn field_names(item: &Item) -> FieldSet {
    item.keys()
        .filter(|name| !RESERVED_ATTRIBUTES.contains(&name.as_str()))
        .cloned()
        .collect()
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    /// Encoded partition key.
    pub key: String,
    /// Bucket name, present only for tables shared across buckets.
    pub bucket: Option<String>,
}

impl ItemKey {
    /// Key for a table with a single partition key.
    pub fn simple(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bucket: None,
        }
    }

    /// Key for a shared table (partition key plus bucket range key).
    pub fn composite(key: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bucket: Some(bucket.into()),
        }
    }

    /// Schema this key fits.
    pub fn schema(&self) -> KeySchema {
        match self.bucket {
            Some(_) => KeySchema::Composite,
            None => KeySchema::Simple,
        }
    }

    /// Key attributes as they appear on the stored item.
    pub fn to_attributes(&self) -> Item {
        let mut item = Item::new();
        item.insert(
            KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(self.key.clone()),
        );
        if let Some(bucket) = &self.bucket {
            item.insert(
                BUCKET_ATTRIBUTE.to_string(),
                AttributeValue::S(bucket.clone()),
            );
        }
        item
    }

    /// Recover the key from an item's attributes.
    pub fn from_attributes(item: &Item) -> Option<Self> {
        let key = match item.get(KEY_ATTRIBUTE)? {
            AttributeValue::S(s) => s.clone(),
            AttributeValue::Bool(_) => return None,
        };
        let bucket = match item.get(BUCKET_ATTRIBUTE) {
            Some(AttributeValue::S(s)) => Some(s.clone()),
            Some(AttributeValue::Bool(_)) => return None,
            None => None,
        };
        Some(Self { key, bucket })
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bucket {
            Some(bucket) => write!(f, "{}@{bucket}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Primary key layout of a physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    /// Partition key `key` only.
    Simple,
    /// Partition key `key` plus range key `_bucketname`.
    Composite,
}

/// Parameters for creating a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Physical table name.
    pub name: String,
    /// Key layout.
    pub key_schema: KeySchema,
    /// Provisioned read capacity hint.
    pub read_capacity_units: i64,
    /// Provisioned write capacity hint.
    pub write_capacity_units: i64,
}

/// Result of a create-table call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTableOutcome {
    /// The table was created.
    Created,
    /// A table with that name already existed; nothing changed.
    AlreadyExists,
}

// ============================================================================
// Requests
// ============================================================================

/// Kind of field-set update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Mark fields present (`SET #keyN = :trueVal`).
    SetTrue,
    /// Delete fields (`REMOVE #keyN`).
    Remove,
}

/// A field-set update expression.
///
/// Field names are bound to positional placeholders `#key0`, `#key1`, ...
/// in input order, so arbitrary names never appear inside the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    action: UpdateAction,
    names: Vec<(String, String)>,
}

impl FieldUpdate {
    /// Build an update for `fields`, assigning placeholders by index.
    pub fn new(action: UpdateAction, fields: impl IntoIterator<Item = String>) -> Self {
        let names = fields
            .into_iter()
            .enumerate()
            .map(|(idx, field)| (format!("#key{idx}"), field))
            .collect();
        Self { action, names }
    }

    /// SET each field to `true`.
    pub fn set_true(fields: impl IntoIterator<Item = String>) -> Self {
        Self::new(UpdateAction::SetTrue, fields)
    }

    /// REMOVE each field.
    pub fn remove(fields: impl IntoIterator<Item = String>) -> Self {
        Self::new(UpdateAction::Remove, fields)
    }

    /// The update action.
    pub fn action(&self) -> UpdateAction {
        self.action
    }

    /// Placeholder to field name bindings, in placeholder order.
    pub fn attribute_names(&self) -> &[(String, String)] {
        &self.names
    }

    /// Field names touched by this update.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(_, field)| field.as_str())
    }

    /// Returns `true` if no field is touched.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Render the update expression.
    pub fn expression(&self) -> String {
        let clauses: Vec<String> = match self.action {
            UpdateAction::SetTrue => self
                .names
                .iter()
                .map(|(placeholder, _)| format!("{placeholder} = {TRUE_PLACEHOLDER}"))
                .collect(),
            UpdateAction::Remove => self.names.iter().map(|(p, _)| p.clone()).collect(),
        };
        let verb = match self.action {
            UpdateAction::SetTrue => "SET",
            UpdateAction::Remove => "REMOVE",
        };
        format!("{verb} {}", clauses.join(", "))
    }
}

/// Update one item's field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Physical table name.
    pub table: String,
    /// Item to update (created if missing).
    pub key: ItemKey,
    /// Fields to set or remove.
    pub update: FieldUpdate,
}

/// Fetch many items from one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGetRequest {
    /// Physical table name.
    pub table: String,
    /// Keys to fetch.
    pub keys: Vec<ItemKey>,
}

/// Outcome of one batch-get round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetResponse {
    /// Items found among the processed keys.
    pub items: Vec<Item>,
    /// Keys the store did not get to this round.
    pub unprocessed: Vec<ItemKey>,
}

/// Delete many items from one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeleteRequest {
    /// Physical table name.
    pub table: String,
    /// Keys to delete.
    pub keys: Vec<ItemKey>,
}

// ============================================================================
// TableStore
// ============================================================================

/// Store operations consumed by the backend.
///
/// Errors follow the `fabryk_acl::Error` taxonomy: a missing table is
/// reported as `TableNotFound`, everything else as `Store`.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetch one item. `Ok(None)` if the item does not exist.
    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>>;

    /// Fetch many items from one table.
    ///
    /// The store may serve only part of the request; the rest comes back in
    /// [`BatchGetResponse::unprocessed`].
    async fn batch_get_item(&self, request: BatchGetRequest) -> Result<BatchGetResponse>;

    /// Apply a field-set update, creating the item if needed.
    async fn update_item(&self, request: UpdateRequest) -> Result<()>;

    /// Delete many items. Returns the keys the store did not process.
    async fn batch_delete_item(&self, request: BatchDeleteRequest) -> Result<Vec<ItemKey>>;

    /// Create a table. An existing table with the same name is not an error.
    async fn create_table(&self, spec: &TableSpec) -> Result<CreateTableOutcome>;

    /// Delete a table.
    async fn delete_table(&self, table: &str) -> Result<()>;

    /// Names of all tables.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Get the store name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
