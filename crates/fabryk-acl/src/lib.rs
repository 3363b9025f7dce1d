//! # fabryk-acl
//!
//! Storage contract for the Fabryk access-control engine.
//!
//! The permission engine never talks to a database directly. It persists
//! flat sets of field names under `(bucket, key)` pairs through an
//! [`AclBackend`]:
//! - [`AclBackend`]: the pluggable storage trait (`get`, `union`, `add`,
//!   `del`, `remove`, `clean`)
//! - [`Transaction`]: ordered list of deferred mutations, run sequentially
//! - [`Value`] / [`Values`]: key and field-name codec (text or numbers)
//! - [`Error`]: usage, store and configuration errors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod transaction;
pub mod value;

pub use backend::{AclBackend, FieldSet};
pub use error::{Error, Result};
pub use transaction::{OperationFuture, Transaction};
pub use value::{Value, Values};
