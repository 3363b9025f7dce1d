//! [`AclBackend`] implementation over a [`TableStore`].

use async_trait::async_trait;
use fabryk_acl::{AclBackend, Error, FieldSet, Result, Transaction, Value, Values};
use std::sync::Arc;

use crate::batch::BatchRunner;
use crate::config::DynamoDbConfig;
use crate::registry::TableManager;
use crate::router::{self, TableRoute};
use crate::store::{FieldUpdate, ItemKey, TableStore, UpdateRequest, field_names, is_key_attribute};

/// ACL backend storing each bucket's field sets in DynamoDB-style tables.
///
/// Reads go straight to the store. Writes are queued on a [`Transaction`];
/// the first write to a bucket also queues creation of its table.
pub struct DynamoDbBackend {
    config: DynamoDbConfig,
    store: Arc<dyn TableStore>,
    tables: TableManager,
    batches: BatchRunner,
}

impl DynamoDbBackend {
    /// Create a backend over `store`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not validate.
    pub fn new(store: Arc<dyn TableStore>, config: DynamoDbConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "DynamoDB ACL backend on '{}' store (prefix '{}', single table: {})",
            store.name(),
            config.prefix,
            config.single_table
        );
        Ok(Self {
            tables: TableManager::new(
                Arc::clone(&store),
                config.read_capacity_units,
                config.write_capacity_units,
            ),
            batches: BatchRunner::new(Arc::clone(&store), config.backoff()),
            store,
            config,
        })
    }

    /// Create a backend with the default configuration.
    pub fn with_defaults(store: Arc<dyn TableStore>) -> Result<Self> {
        Self::new(store, DynamoDbConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &DynamoDbConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Register existing tables carrying the configured prefix.
    ///
    /// Returns the number of newly registered tables.
    pub async fn refresh_tables(&self) -> Result<usize> {
        self.tables.refresh(&self.config.prefix).await
    }

    /// Drop `table` from the registry so the next write re-creates it.
    pub fn forget_table(&self, table: &str) -> bool {
        self.tables.registry().forget(table)
    }

    /// Tables the backend believes exist, sorted.
    pub fn tracked_tables(&self) -> Vec<String> {
        self.tables.registry().tables()
    }

    /// Resolve the table for `bucket`.
    pub fn route(&self, bucket: &str) -> Result<TableRoute> {
        if bucket.is_empty() {
            return Err(Error::usage("bucket name must not be empty"));
        }
        let table_route = router::route(&self.config, bucket);
        if table_route.table_name.is_empty() {
            return Err(Error::usage(format!(
                "bucket '{bucket}' does not yield a usable table name"
            )));
        }
        Ok(table_route)
    }

    fn check_fields(fields: &[String]) -> Result<()> {
        match fields.iter().find(|f| is_key_attribute(f)) {
            Some(field) => Err(Error::reserved(field.as_str())),
            None => Ok(()),
        }
    }

    fn enqueue_update(
        &self,
        transaction: &mut Transaction,
        table_route: &TableRoute,
        bucket: &str,
        key: Value,
        update: FieldUpdate,
    ) {
        if update.is_empty() {
            log::debug!("No fields to update for '{key}' in '{bucket}'");
            return;
        }
        let store = Arc::clone(&self.store);
        let request = UpdateRequest {
            table: table_route.table_name.clone(),
            key: table_route.item_key(bucket, key.encode()),
            update,
        };
        log::debug!(
            "Queued update on {}/{}: {}",
            request.table,
            request.key,
            request.update.expression()
        );
        transaction.push(
            format!("update-item {}/{}", request.table, request.key),
            move || async move { store.update_item(request).await },
        );
    }
}

#[async_trait]
impl AclBackend for DynamoDbBackend {
    async fn clean(&self) -> Result<()> {
        self.tables.clean().await
    }

    async fn get(&self, bucket: &str, key: Value) -> Result<FieldSet> {
        let table_route = self.route(bucket)?;
        let item_key = table_route.item_key(bucket, key.encode());
        match self.store.get_item(&table_route.table_name, &item_key).await {
            Ok(Some(item)) => Ok(field_names(&item)),
            Ok(None) => Ok(FieldSet::new()),
            Err(Error::TableNotFound { table }) => {
                log::debug!("get on missing table '{table}'");
                Ok(FieldSet::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn union(&self, bucket: &str, keys: Values) -> Result<FieldSet> {
        let table_route = self.route(bucket)?;
        let item_keys: Vec<ItemKey> = keys
            .encode_unique()
            .into_iter()
            .map(|key| table_route.item_key(bucket, key))
            .collect();
        match self
            .batches
            .field_union(&table_route.table_name, item_keys)
            .await
        {
            Err(Error::TableNotFound { table }) => {
                log::debug!("union on missing table '{table}'");
                Ok(FieldSet::new())
            }
            result => result,
        }
    }

    fn add(
        &self,
        transaction: &mut Transaction,
        bucket: &str,
        key: Value,
        values: Values,
    ) -> Result<()> {
        let table_route = self.route(bucket)?;
        let fields = values.encode_unique();
        Self::check_fields(&fields)?;

        self.tables.enqueue_create(transaction, &table_route);
        self.enqueue_update(
            transaction,
            &table_route,
            bucket,
            key,
            FieldUpdate::set_true(fields),
        );
        Ok(())
    }

    fn del(&self, transaction: &mut Transaction, bucket: &str, keys: Values) -> Result<()> {
        let table_route = self.route(bucket)?;
        let item_keys: Vec<ItemKey> = keys
            .encode_unique()
            .into_iter()
            .map(|key| table_route.item_key(bucket, key))
            .collect();
        if item_keys.is_empty() {
            log::debug!("No keys to delete in '{bucket}'");
            return Ok(());
        }

        let batches = self.batches.clone();
        let table = table_route.table_name;
        log::debug!("Queued delete of {} keys from '{table}'", item_keys.len());
        transaction.push(format!("batch-delete {table}"), move || async move {
            batches.delete_all(&table, item_keys).await
        });
        Ok(())
    }

    fn remove(
        &self,
        transaction: &mut Transaction,
        bucket: &str,
        key: Value,
        values: Values,
    ) -> Result<()> {
        let table_route = self.route(bucket)?;
        let fields = values.encode_unique();
        Self::check_fields(&fields)?;

        self.enqueue_update(
            transaction,
            &table_route,
            bucket,
            key,
            FieldUpdate::remove(fields),
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dynamodb"
    }
}

// ============================================================================
// Tests
// ============================================================================
