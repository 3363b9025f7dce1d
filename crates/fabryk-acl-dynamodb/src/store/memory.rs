//! In-memory table store.
//!
//! Behaves like a single-node DynamoDB for the operations the backend uses:
//! tables must exist before they are read or written, keys must match the
//! table's key schema, and `update_item` upserts. A few knobs reproduce the
//! awkward parts of the real service:
//!
//! - [`throttle_batch_reads`](MemoryTableStore::throttle_batch_reads): the
//!   next N batch reads serve nothing and report every key unprocessed
//! - [`with_batch_read_limit`](MemoryTableStore::with_batch_read_limit): serve
//!   at most N keys per batch read
//! - [`throttle_batch_deletes`](MemoryTableStore::throttle_batch_deletes):
//!   the next N batch deletes remove nothing and report every key
//!   unprocessed
//! - [`fail_operation`](MemoryTableStore::fail_operation): make an operation
//!   fail until cleared

use async_trait::async_trait;
use fabryk_acl::{Error, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    AttributeValue, BatchDeleteRequest, BatchGetRequest, BatchGetResponse, CreateTableOutcome,
    Item, ItemKey, TableSpec, TableStore, UpdateAction, UpdateRequest,
};

struct MemoryTable {
    spec: TableSpec,
    items: HashMap<ItemKey, Item>,
}

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, MemoryTable>,
    throttled_batch_reads: usize,
    throttled_batch_deletes: usize,
    batch_read_limit: Option<usize>,
    failing: HashSet<&'static str>,
    batch_read_calls: usize,
    batch_delete_calls: usize,
    create_table_calls: usize,
}

/// In-memory [`TableStore`].
#[derive(Default)]
pub struct MemoryTableStore {
    inner: Mutex<Inner>,
}

impl MemoryTableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve at most `limit` keys per batch read; the rest are unprocessed.
    pub fn with_batch_read_limit(self, limit: usize) -> Self {
        self.lock().batch_read_limit = Some(limit.max(1));
        self
    }

    /// Make the next `count` batch reads return no items and every key
    /// unprocessed.
    pub fn throttle_batch_reads(&self, count: usize) {
        self.lock().throttled_batch_reads = count;
    }

    /// Make the next `count` batch deletes remove nothing and return every
    /// key unprocessed.
    pub fn throttle_batch_deletes(&self, count: usize) {
        self.lock().throttled_batch_deletes = count;
    }

    /// Make every call of `operation` fail (e.g. `"update-item"`).
    pub fn fail_operation(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Number of batch-get calls received.
    pub fn batch_read_calls(&self) -> usize {
        self.lock().batch_read_calls
    }

    /// Number of batch-delete calls received.
    pub fn batch_delete_calls(&self) -> usize {
        self.lock().batch_delete_calls
    }

    /// Number of create-table calls received, duplicates included.
    pub fn create_table_calls(&self) -> usize {
        self.lock().create_table_calls
    }

    /// Names of existing tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    /// Number of items in `table`, if it exists.
    pub fn item_count(&self, table: &str) -> Option<usize> {
        self.lock().tables.get(table).map(|t| t.items.len())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(Error::transient(operation, "injected failure"));
        }
        Ok(())
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::table_not_found(name))
    }
}

impl MemoryTable {
    fn check_key(&self, operation: &'static str, key: &ItemKey) -> Result<()> {
        if key.schema() != self.spec.key_schema {
            return Err(Error::store(
                operation,
                format!(
                    "key {key} does not match the key schema of table '{}'",
                    self.spec.name
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>> {
        let inner = self.lock();
        inner.check("get-item")?;
        let table = inner.table(table)?;
        table.check_key("get-item", key)?;
        Ok(table.items.get(key).cloned())
    }

    async fn batch_get_item(&self, request: BatchGetRequest) -> Result<BatchGetResponse> {
        let mut inner = self.lock();
        inner.batch_read_calls += 1;
        inner.check("batch-get-item")?;
        if inner.throttled_batch_reads > 0 {
            inner.throttled_batch_reads -= 1;
            inner.table(&request.table)?;
            return Ok(BatchGetResponse {
                items: Vec::new(),
                unprocessed: request.keys,
            });
        }

        let limit = inner.batch_read_limit.unwrap_or(usize::MAX);
        let table = inner.table(&request.table)?;
        let mut keys = request.keys;
        let unprocessed = if keys.len() > limit {
            keys.split_off(limit)
        } else {
            Vec::new()
        };

        let mut items = Vec::new();
        for key in &keys {
            table.check_key("batch-get-item", key)?;
            if let Some(item) = table.items.get(key) {
                items.push(item.clone());
            }
        }

        Ok(BatchGetResponse { items, unprocessed })
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<()> {
        let mut inner = self.lock();
        inner.check("update-item")?;
        let table = inner.table_mut(&request.table)?;
        table.check_key("update-item", &request.key)?;

        let item = table
            .items
            .entry(request.key.clone())
            .or_insert_with(|| request.key.to_attributes());
        for field in request.update.fields() {
            match request.update.action() {
                UpdateAction::SetTrue => {
                    item.insert(field.to_string(), AttributeValue::Bool(true));
                }
                UpdateAction::Remove => {
                    item.remove(field);
                }
            }
        }
        Ok(())
    }

    async fn batch_delete_item(&self, request: BatchDeleteRequest) -> Result<Vec<ItemKey>> {
        let mut inner = self.lock();
        inner.batch_delete_calls += 1;
        inner.check("batch-write-item")?;
        let throttled = inner.throttled_batch_deletes > 0;
        if throttled {
            inner.throttled_batch_deletes -= 1;
        }
        let table = inner.table_mut(&request.table)?;
        for key in &request.keys {
            table.check_key("batch-write-item", key)?;
        }
        if throttled {
            return Ok(request.keys);
        }
        for key in &request.keys {
            table.items.remove(key);
        }
        Ok(Vec::new())
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<CreateTableOutcome> {
        let mut inner = self.lock();
        inner.create_table_calls += 1;
        inner.check("create-table")?;
        if inner.tables.contains_key(&spec.name) {
            return Ok(CreateTableOutcome::AlreadyExists);
        }
        inner.tables.insert(
            spec.name.clone(),
            MemoryTable {
                spec: spec.clone(),
                items: HashMap::new(),
            },
        );
        Ok(CreateTableOutcome::Created)
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check("delete-table")?;
        inner
            .tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| Error::table_not_found(table))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let inner = self.lock();
        inner.check("list-tables")?;
        Ok(inner.tables.keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
