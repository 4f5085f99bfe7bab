//! Error types for catalog and config loading.
//!
//! Provides a unified error type covering I/O, JSON/YAML parsing, and
//! unsupported file formats. Converts into
//! [`StoreError`](sqlstore_core::StoreError) at the store boundary.

use std::path::PathBuf;

use sqlstore_core::StoreError;
use thiserror::Error;

/// Errors that can occur while loading catalogs or store configs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension is not one of `json`, `yaml`, `yml`.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for StoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::IoError(e) => StoreError::Io(e),
            other => StoreError::Parse(other.to_string()),
        }
    }
}
