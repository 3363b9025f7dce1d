//! ACL storage backend trait.
//!
//! The permission engine treats storage as a set-membership structure: every
//! `(bucket, key)` pair owns a flat set of field names. Backends implement
//! [`AclBackend`] to persist those sets wherever they like.
//!
//! Reads go straight to storage. Mutations are queued on a [`Transaction`]
//! obtained from [`AclBackend::begin`] and only reach storage once the
//! transaction is handed to [`AclBackend::end`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut tx = backend.begin();
//! backend.add(&mut tx, "docs", "u1".into(), ["read", "write"].into())?;
//! backend.end(tx).await?;
//!
//! let fields = backend.get("docs", "u1".into()).await?;
//! assert!(fields.contains("read"));
//! ```

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::transaction::Transaction;
use crate::value::{Value, Values};

/// Set of field names stored under one or more keys.
pub type FieldSet = BTreeSet<String>;

/// Abstract ACL storage backend.
#[async_trait]
pub trait AclBackend: Send + Sync {
    /// Start a new, empty transaction.
    fn begin(&self) -> Transaction {
        Transaction::new()
    }

    /// Execute a transaction, running its operations strictly in order.
    ///
    /// Reports the first error after every operation has been attempted.
    async fn end(&self, transaction: Transaction) -> Result<()> {
        transaction.execute().await
    }

    /// Remove everything this backend has stored.
    async fn clean(&self) -> Result<()>;

    /// Field names stored at `key` in `bucket`.
    ///
    /// A missing key yields an empty set, not an error.
    async fn get(&self, bucket: &str, key: Value) -> Result<FieldSet>;

    /// Union of the field names stored at each of `keys` in `bucket`.
    async fn union(&self, bucket: &str, keys: Values) -> Result<FieldSet>;

    /// Queue marking `values` as present at `key` in `bucket`.
    ///
    /// Fails immediately, queuing nothing, if a value is unusable as a field
    /// name.
    fn add(
        &self,
        transaction: &mut Transaction,
        bucket: &str,
        key: Value,
        values: Values,
    ) -> Result<()>;

    /// Queue deleting `keys` from `bucket`.
    fn del(&self, transaction: &mut Transaction, bucket: &str, keys: Values) -> Result<()>;

    /// Queue removing `values` from `key` in `bucket`.
    fn remove(
        &self,
        transaction: &mut Transaction,
        bucket: &str,
        key: Value,
        values: Values,
    ) -> Result<()>;

    /// Get the backend name for diagnostics.
    fn name(&self) -> &str;
}
