//! Error types shared by every data store driver.
//!
//! [`StoreError`] is the single error type returned through the
//! [`DataStore`](crate::DataStore) facade. Driver crates define their own
//! error enums and convert them into [`StoreError`] at the facade boundary.
//! [`ErrorKind`] groups the variants into the coarse categories callers
//! usually branch on.

use thiserror::Error;

/// Boxed driver-level error carried by [`StoreError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while composing or using a data store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No factory is registered under the requested driver name.
    #[error("driver {0:?} not found")]
    DriverNotFound(String),

    /// Malformed driver config, store state, or query definition.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed query-definition source.
    #[error("parse error: {0}")]
    Parse(String),

    /// Query-definition source or config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No loaded catalog defines the requested query name.
    #[error("query {0:?} not found")]
    QueryNotFound(String),

    /// A single-row query produced no rows.
    #[error("query {0:?} returned no rows")]
    NoRows(String),

    /// A single-row query produced more than one row.
    #[error("query {0:?} returned more than one row")]
    TooManyRows(String),

    /// The bind argument does not supply a parameter the statement references.
    #[error("missing bind parameter {0:?}")]
    MissingParameter(String),

    /// The bind argument could not be turned into named parameters.
    #[error("invalid bind argument: {0}")]
    Bind(String),

    /// A result row could not be decoded into the destination type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying database or driver failure.
    #[error("execution error: {0}")]
    Execution(#[source] BoxError),

    /// The store was closed before the operation was attempted.
    #[error("data store is closed")]
    Closed,
}

/// Coarse classification of [`StoreError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown driver, malformed config, or an unusable query definition.
    Config,
    /// Malformed query-definition source.
    Parse,
    /// Unreadable file.
    Io,
    /// Unknown query name, or zero rows where one was required.
    NotFound,
    /// More than one row where exactly one was required.
    AmbiguousResult,
    /// Database, binding, or decoding failure during execution.
    Execution,
    /// Operation attempted after close.
    Closed,
}

impl StoreError {
    /// Wraps any driver error as [`StoreError::Execution`].
    pub fn execution(err: impl Into<BoxError>) -> Self {
        Self::Execution(err.into())
    }

    /// Returns the category this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlstore_core::{ErrorKind, StoreError};
    ///
    /// let err = StoreError::DriverNotFound("oracle".into());
    /// assert_eq!(err.kind(), ErrorKind::Config);
    /// assert!(err.to_string().contains("oracle"));
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DriverNotFound(_) | Self::Config(_) => ErrorKind::Config,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Io(_) => ErrorKind::Io,
            Self::QueryNotFound(_) | Self::NoRows(_) => ErrorKind::NotFound,
            Self::TooManyRows(_) => ErrorKind::AmbiguousResult,
            Self::MissingParameter(_) | Self::Bind(_) | Self::Decode(_) | Self::Execution(_) => {
                ErrorKind::Execution
            }
            Self::Closed => ErrorKind::Closed,
        }
    }

    /// Returns `true` for "no such query" and "no such row" failures.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
