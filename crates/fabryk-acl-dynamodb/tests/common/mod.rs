//! Common test utilities and harness for the DynamoDB ACL backend tests.

use fabryk_acl::{AclBackend, FieldSet, Value, Values};
use fabryk_acl_dynamodb::{DynamoDbBackend, DynamoDbConfig, MemoryTableStore, TableStore};
use std::sync::Arc;

/// Backend wired to an in-memory store the test can inspect.
pub struct TestHarness {
    /// Store shared with the backend
    pub store: Arc<MemoryTableStore>,
    /// Backend under test
    pub backend: DynamoDbBackend,
}

impl TestHarness {
    /// Creates a harness with the default configuration and an `acl_` prefix.
    pub fn new() -> Self {
        Self::with_config(DynamoDbConfig::default().with_prefix("acl_"))
    }

    /// Creates a harness in single-table mode.
    pub fn single_table() -> Self {
        Self::with_config(
            DynamoDbConfig::default()
                .with_prefix("acl_single_")
                .with_single_table(true),
        )
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: DynamoDbConfig) -> Self {
        Self::with_store(MemoryTableStore::new(), config)
    }

    /// Creates a harness over a preconfigured store.
    pub fn with_store(store: MemoryTableStore, config: DynamoDbConfig) -> Self {
        let store = Arc::new(store);
        let backend = DynamoDbBackend::new(Arc::clone(&store) as Arc<dyn TableStore>, config)
            .expect("test config should be valid");
        Self { store, backend }
    }

    /// Adds `values` to `key` in `bucket` in a transaction of its own.
    pub async fn grant(&self, bucket: &str, key: impl Into<Value>, values: impl Into<Values>) {
        let mut tx = self.backend.begin();
        self.backend
            .add(&mut tx, bucket, key.into(), values.into())
            .expect("add should queue");
        self.backend.end(tx).await.expect("add should succeed");
    }

    /// Reads `key` from `bucket`.
    pub async fn fields(&self, bucket: &str, key: impl Into<Value>) -> FieldSet {
        self.backend
            .get(bucket, key.into())
            .await
            .expect("get should succeed")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a field set from string literals.
pub fn field_set(names: &[&str]) -> FieldSet {
    names.iter().map(|s| s.to_string()).collect()
}
