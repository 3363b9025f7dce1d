//! Deferred-operation transactions.
//!
//! A [`Transaction`] is an ordered list of operations that backends append to
//! instead of talking to the store immediately. Nothing runs until
//! [`Transaction::execute`] is awaited, at which point every operation is run
//! strictly in sequence, one in flight at a time.
//!
//! This is not an atomic transaction. All operations are attempted even after
//! one fails, the first failure is reported once the list is exhausted, and
//! successful operations are never rolled back.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut tx = Transaction::new();
//! tx.push("create-table acl_users", move || async move { store.create_table(&spec).await });
//! tx.push("update-item acl_users", move || async move { store.update_item(request).await });
//! tx.execute().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Type alias for the future produced by a deferred operation.
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type Operation = Box<dyn FnOnce() -> OperationFuture + Send>;

struct Step {
    label: String,
    run: Operation,
}

/// An ordered list of deferred operations.
#[derive(Default)]
pub struct Transaction {
    steps: Vec<Step>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append an operation.
    ///
    /// The closure captures its own parameters and is only invoked by
    /// [`execute`](Self::execute). The label shows up in logs.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let label = label.into();
        log::debug!("Enqueued step #{}: {label}", self.steps.len());
        self.steps.push(Step {
            label,
            run: Box::new(move || Box::pin(op())),
        });
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Labels of the queued operations, in execution order.
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.label.as_str()).collect()
    }

    /// Run every operation in order and report the first error, if any.
    ///
    /// Later operations still run after a failure.
    pub async fn execute(self) -> Result<()> {
        let total = self.steps.len();
        let mut first_error = None;
        let mut failures = 0usize;

        for (idx, step) in self.steps.into_iter().enumerate() {
            match (step.run)().await {
                Ok(()) => log::debug!("Step {}/{total} succeeded: {}", idx + 1, step.label),
                Err(e) => {
                    log::warn!("Step {}/{total} failed: {}: {e}", idx + 1, step.label);
                    failures += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => {
                log::warn!("Transaction finished with {failures} of {total} steps failed");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("steps", &self.labels())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
