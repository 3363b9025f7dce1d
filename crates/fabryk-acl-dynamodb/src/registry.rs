//! Table registry and lifecycle.
//!
//! [`TableRegistry`] remembers which physical tables the backend believes
//! exist. It is a cache, not a source of truth: names are registered when a
//! create step is *queued*, so a creation that later fails still suppresses
//! further attempts until [`TableRegistry::forget`] is called or the process
//! restarts. Duplicate create calls against a table that already exists are
//! absorbed by the store (`CreateTableOutcome::AlreadyExists`).
//!
//! [`TableManager`] owns the registry and turns a route into a queued
//! create-table step the first time the table is needed.

use fabryk_acl::{Error, Result, Transaction};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::router::TableRoute;
use crate::store::{CreateTableOutcome, TableSpec, TableStore};

// ============================================================================
// TableRegistry
// ============================================================================

/// Set of table names believed to exist.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Mutex<BTreeSet<String>>,
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `table` is registered.
    pub fn contains(&self, table: &str) -> bool {
        self.lock().contains(table)
    }

    /// Register `table`. Returns `false` if it was already registered.
    pub fn register(&self, table: impl Into<String>) -> bool {
        self.lock().insert(table.into())
    }

    /// Drop `table` from the registry. Returns `false` if it was not there.
    pub fn forget(&self, table: &str) -> bool {
        self.lock().remove(table)
    }

    /// Registered names, sorted.
    pub fn tables(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// TableManager
// ============================================================================

/// Creates tables lazily and tracks them in a [`TableRegistry`].
pub struct TableManager {
    store: Arc<dyn TableStore>,
    registry: TableRegistry,
    read_capacity_units: i64,
    write_capacity_units: i64,
}

impl TableManager {
    /// Create a manager using the given capacity hints for new tables.
    pub fn new(store: Arc<dyn TableStore>, read_capacity_units: i64, write_capacity_units: i64) -> Self {
        Self {
            store,
            registry: TableRegistry::new(),
            read_capacity_units,
            write_capacity_units,
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Table spec for a route.
    pub fn spec_for(&self, route: &TableRoute) -> TableSpec {
        TableSpec {
            name: route.table_name.clone(),
            key_schema: route.key_schema(),
            read_capacity_units: self.read_capacity_units,
            write_capacity_units: self.write_capacity_units,
        }
    }

    /// Queue a create-table step unless the table is already registered.
    ///
    /// Returns `true` if a step was queued.
    pub fn enqueue_create(&self, transaction: &mut Transaction, route: &TableRoute) -> bool {
        if !self.registry.register(route.table_name.as_str()) {
            return false;
        }

        let spec = self.spec_for(route);
        let store = Arc::clone(&self.store);
        transaction.push(format!("create-table {}", spec.name), move || async move {
            match store.create_table(&spec).await? {
                CreateTableOutcome::Created => {
                    log::info!("Created table '{}' ({:?} key)", spec.name, spec.key_schema)
                }
                CreateTableOutcome::AlreadyExists => {
                    log::debug!("Table '{}' already exists", spec.name)
                }
            }
            Ok(())
        });
        true
    }

    /// Register every existing table whose name starts with `prefix`.
    ///
    /// Returns the number of newly registered tables.
    pub async fn refresh(&self, prefix: &str) -> Result<usize> {
        let names = self.store.list_tables().await?;
        let added = names
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .filter(|name| self.registry.register(name.as_str()))
            .count();
        log::info!(
            "Registered {added} existing tables with prefix '{prefix}' ({} tracked)",
            self.registry.len()
        );
        Ok(added)
    }

    /// Delete every registered table, in order.
    ///
    /// All deletions are attempted; tables that are gone afterwards are
    /// dropped from the registry and the first failure is reported.
    pub async fn clean(&self) -> Result<()> {
        let mut first_error: Option<Error> = None;
        for table in self.registry.tables() {
            match self.store.delete_table(&table).await {
                Ok(()) => {
                    log::info!("Deleted table '{table}'");
                    self.registry.forget(&table);
                }
                Err(Error::TableNotFound { .. }) => {
                    log::debug!("Table '{table}' was already gone");
                    self.registry.forget(&table);
                }
                Err(e) => {
                    log::warn!("Failed to delete table '{table}': {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

// ============================================================================
// Tests
// ============================================================================
