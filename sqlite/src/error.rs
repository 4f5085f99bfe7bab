//! Error types for the SQLite driver.
//!
//! Provides a unified error type covering database access, connection
//! pooling, parameter binding, and driver configuration failures.

use sqlstore_core::StoreError;
use thiserror::Error;

/// Errors that can occur inside the SQLite driver.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Connection pool failure (checkout timeout, broken connection).
    #[error("pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    /// Driver config string or settings file is invalid.
    #[error("invalid sqlite config: {0}")]
    InvalidConfig(String),

    /// Statement references a name the bind argument does not supply.
    #[error("missing bind parameter {0:?}")]
    MissingParameter(String),

    /// A TEXT column holds bytes that are not valid UTF-8.
    #[error("column {column:?} holds invalid UTF-8 text: {source}")]
    InvalidText {
        column: String,
        source: std::str::Utf8Error,
    },

    /// Statement uses a parameter form the driver cannot bind by name.
    #[error("unsupported parameter at position {0}: only named parameters are supported")]
    PositionalParameter(usize),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

impl From<SqliteError> for StoreError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::InvalidConfig(msg) => StoreError::Config(msg),
            SqliteError::MissingParameter(name) => StoreError::MissingParameter(name),
            err @ SqliteError::InvalidText { .. } => StoreError::Decode(err.to_string()),
            other => StoreError::execution(other),
        }
    }
}
