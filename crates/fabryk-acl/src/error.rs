//! Error types for fabryk-acl

use thiserror::Error;

/// Result type alias for fabryk-acl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while storing or reading ACL data.
///
/// Usage errors are raised before anything reaches the store. Store errors
/// carry the underlying client error as their source and are passed through
/// to the caller unchanged. Whether a store error is worth retrying is
/// decided by the store that raised it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed arguments (empty bucket, unusable table name, ...)
    #[error("Invalid usage: {message}")]
    Usage {
        /// What was wrong with the call
        message: String,
    },

    /// A field name collides with an attribute reserved for the item key
    #[error("Field name '{name}' is reserved for the item key")]
    ReservedAttribute {
        /// The offending field name
        name: String,
    },

    /// The store reports that a table does not exist
    #[error("Table not found: {table}")]
    TableNotFound {
        /// Physical table name
        table: String,
    },

    /// Any other failure reported by the backing store
    #[error("Store error during {operation}: {message}")]
    Store {
        /// Store operation that failed (e.g. `update-item`)
        operation: &'static str,
        /// Human-readable error message
        message: String,
        /// Whether the store reported the failure as transient
        retryable: bool,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A batch request still had unprocessed keys when the retry ceiling was hit
    #[error("Batch {operation} on '{table}' gave up after {attempts} retries ({unprocessed} keys unprocessed)")]
    RetriesExhausted {
        /// Batch operation (`read` or `delete`)
        operation: &'static str,
        /// Physical table name
        table: String,
        /// Number of retries issued
        attempts: u32,
        /// Keys still unprocessed
        unprocessed: usize,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new usage error.
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    /// Creates a reserved-attribute error.
    pub fn reserved<S: Into<String>>(name: S) -> Self {
        Error::ReservedAttribute { name: name.into() }
    }

    /// Creates a table-not-found error.
    pub fn table_not_found<S: Into<String>>(table: S) -> Self {
        Error::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates a permanent store error without a source.
    pub fn store<S: Into<String>>(operation: &'static str, message: S) -> Self {
        Error::Store {
            operation,
            message: message.into(),
            retryable: false,
            source: None,
        }
    }

    /// Creates a permanent store error wrapping the client error that caused it.
    pub fn store_with_source<S, E>(operation: &'static str, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            operation,
            message: message.into(),
            retryable: false,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a store error for a transient failure (throttling, timeouts,
    /// connection loss).
    pub fn transient<S: Into<String>>(operation: &'static str, message: S) -> Self {
        Error::Store {
            operation,
            message: message.into(),
            retryable: true,
            source: None,
        }
    }

    /// Creates a transient store error wrapping the client error that caused it.
    pub fn transient_with_source<S, E>(operation: &'static str, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            operation,
            message: message.into(),
            retryable: true,
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised before anything reached the store.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage { .. } | Error::ReservedAttribute { .. })
    }

    /// Returns whether retrying the same call could succeed.
    ///
    /// Store errors are retryable only when the store flagged them as
    /// transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store { retryable, .. } => *retryable,
            Error::RetriesExhausted { .. } => true,
            Error::Io(_) => true,
            Error::TableNotFound { .. } => false,
            Error::Usage { .. } => false,
            Error::ReservedAttribute { .. } => false,
            Error::Config { .. } => false,
        }
    }
}
