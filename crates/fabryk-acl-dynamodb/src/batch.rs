//! Batch read and delete engine.
//!
//! Issues one batch request for every key, keeps whatever the store
//! processed, and re-requests exactly the keys it reports as unprocessed
//! after a `retry² × unit` delay. The loop ends once a response has no
//! unprocessed keys, or with `RetriesExhausted` if a retry ceiling is
//! configured and reached.

use backon::BackoffBuilder;
use fabryk_acl::{Error, FieldSet, Result};
use std::sync::Arc;

use crate::backoff::QuadraticBackoffBuilder;
use crate::store::{BatchDeleteRequest, BatchGetRequest, Item, ItemKey, TableStore, field_names};

/// Multi-key reads and deletes over one table at a time.
#[derive(Clone)]
pub struct BatchRunner {
    store: Arc<dyn TableStore>,
    backoff: QuadraticBackoffBuilder,
}

impl BatchRunner {
    /// Create a runner with the given retry schedule.
    pub fn new(store: Arc<dyn TableStore>, backoff: QuadraticBackoffBuilder) -> Self {
        Self { store, backoff }
    }

    /// Fetch every item among `keys`, retrying unprocessed keys.
    ///
    /// Missing items are simply absent from the result.
    pub async fn read_all(&self, table: &str, keys: Vec<ItemKey>) -> Result<Vec<Item>> {
        let store = &self.store;
        self.drain("read", table, keys, move |keys| async move {
            let response = store
                .batch_get_item(BatchGetRequest {
                    table: table.to_string(),
                    keys,
                })
                .await?;
            Ok::<_, Error>((response.items, response.unprocessed))
        })
        .await
    }

    /// Union of the field names of every item among `keys`.
    pub async fn field_union(&self, table: &str, keys: Vec<ItemKey>) -> Result<FieldSet> {
        let items = self.read_all(table, keys).await?;
        Ok(items.iter().flat_map(field_names).collect())
    }

    /// Delete every item among `keys`, retrying unprocessed keys.
    pub async fn delete_all(&self, table: &str, keys: Vec<ItemKey>) -> Result<()> {
        let store = &self.store;
        self.drain("delete", table, keys, move |keys| async move {
            let unprocessed = store
                .batch_delete_item(BatchDeleteRequest {
                    table: table.to_string(),
                    keys,
                })
                .await?;
            Ok::<_, Error>((Vec::<()>::new(), unprocessed))
        })
        .await?;
        Ok(())
    }

    async fn drain<T, F, Fut>(
        &self,
        operation: &'static str,
        table: &str,
        keys: Vec<ItemKey>,
        mut call: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(Vec<ItemKey>) -> Fut,
        Fut: Future<Output = Result<(Vec<T>, Vec<ItemKey>)>>,
    {
        let mut done = Vec::new();
        if keys.is_empty() {
            return Ok(done);
        }

        let mut backoff = self.backoff.build();
        let mut pending = keys;
        loop {
            log::debug!(
                "batch-{operation} {table}: requesting {} keys (retry {})",
                pending.len(),
                backoff.retries()
            );
            let (processed, unprocessed) = call(pending).await?;
            done.extend(processed);

            if unprocessed.is_empty() {
                break;
            }
            pending = unprocessed;

            let Some(delay) = backoff.next() else {
                log::warn!(
                    "batch-{operation} {table}: giving up after {} retries, {} keys unprocessed",
                    backoff.retries(),
                    pending.len()
                );
                return Err(Error::RetriesExhausted {
                    operation,
                    table: table.to_string(),
                    attempts: backoff.retries(),
                    unprocessed: pending.len(),
                });
            };
            log::warn!(
                "batch-{operation} {table}: {} keys unprocessed, retry {} in {delay:?}",
                pending.len(),
                backoff.retries()
            );
            tokio::time::sleep(delay).await;
        }

        Ok(done)
    }
}

// ============================================================================
// Tests
// ============================================================================
