//! # fabryk-acl-dynamodb
//!
//! DynamoDB-style table storage for the Fabryk access-control engine.
//!
//! Each bucket's field sets live in a key/value table:
//! - [`router`]: bucket to table routing (dedicated, `allows*` shared, or
//!   single-table mode)
//! - [`registry`]: lazily created tables and the set of tables believed to
//!   exist
//! - [`batch`]: multi-key reads and deletes that retry unprocessed keys with
//!   quadratic backoff
//! - [`store`]: the [`TableStore`] seam, an in-memory store and (with the
//!   `aws-sdk` feature) an adapter over `aws_sdk_dynamodb::Client`
//! - [`DynamoDbBackend`]: the [`fabryk_acl::AclBackend`] tying it together
//!
//! # Example
//!
//! ```rust
//! use fabryk_acl::AclBackend;
//! use fabryk_acl_dynamodb::{DynamoDbBackend, DynamoDbConfig, MemoryTableStore};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryTableStore::new());
//! let backend = DynamoDbBackend::new(store, DynamoDbConfig::default().with_prefix("acl_"))?;
//!
//! let mut tx = backend.begin();
//! backend.add(&mut tx, "docs", "u1".into(), ["read", "write"].into())?;
//! backend.end(tx).await?;
//!
//! let fields = backend.get("docs", "u1".into()).await?;
//! assert!(fields.contains("read"));
//! # Ok::<(), fabryk_acl::Error>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod backoff;
pub mod batch;
pub mod config;
pub mod registry;
pub mod router;
pub mod store;

pub use backend::DynamoDbBackend;
pub use backoff::{QuadraticBackoff, QuadraticBackoffBuilder};
pub use config::DynamoDbConfig;
pub use registry::{TableManager, TableRegistry};
pub use router::TableRoute;
#[cfg(feature = "aws-sdk")]
pub use store::DynamoDbStore;
pub use store::{MemoryTableStore, TableStore};
