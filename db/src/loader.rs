//! Query catalog loading with format detection.
//!
//! Provides [`CatalogLoader`] for reading query-definition files and
//! directories of them.
//!
//! # Source format
//!
//! ```yaml
//! driver: sqlite
//! schema: accounts
//! queries:
//!   user.by_id:
//!     table: users
//!     command: select
//!     columns: ["*"]
//!     filters: [id]
//!   user.add:
//!     table: users
//!     command: insert
//!     columns: [name, email]
//! ```
//!
//! The same structure is accepted as JSON. Unknown keys and a missing
//! `queries` map are parse errors.
//!
//! # Loading patterns
//!
//! ```no_run
//! use sqlstore_db::CatalogLoader;
//!
//! // A single file, format chosen by extension
//! let catalog = CatalogLoader::from_file("queries/accounts.yaml").unwrap();
//!
//! // Every catalog in a directory
//! let catalogs = CatalogLoader::from_dir("queries/").unwrap();
//!
//! // Either of the above, depending on what the path names
//! let catalogs = CatalogLoader::from_path("queries/").unwrap();
//! ```

use std::path::Path;

use sqlstore_core::QueryCatalog;
use tracing::debug;

use crate::error::{CatalogError, Result};

/// Encodings accepted for query-definition sources and configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl SourceFormat {
    /// Picks the format from a file extension (`json`, `yaml`, `yml`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Returns `true` if `path` has a recognized extension.
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Reads [`QueryCatalog`]s from query-definition sources.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Parses a catalog from text in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::JsonError`] or [`CatalogError::YamlError`] if
    /// the text does not describe a catalog.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlstore_db::{CatalogLoader, SourceFormat};
    ///
    /// let yaml = r#"
    /// schema: app
    /// queries:
    ///   users.all: { table: users, command: select, columns: ["*"] }
    /// "#;
    /// let catalog = CatalogLoader::from_str(yaml, SourceFormat::Yaml).unwrap();
    /// assert_eq!(catalog.get("users.all").unwrap().render(), "SELECT * FROM users");
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str, format: SourceFormat) -> Result<QueryCatalog> {
        let catalog = match format {
            SourceFormat::Json => serde_json::from_str(text)?,
            SourceFormat::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(catalog)
    }

    /// Loads a single catalog file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for unknown extensions,
    /// [`CatalogError::IoError`] if the file cannot be read, or a JSON/YAML
    /// error if parsing fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<QueryCatalog> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_str(&text, format)?;
        debug!(
            path = %path.display(),
            schema = %catalog.schema,
            queries = catalog.len(),
            "loaded query catalog"
        );
        Ok(catalog)
    }

    /// Loads every `*.json`, `*.yaml`, and `*.yml` file in a directory.
    ///
    /// Catalogs are returned sorted by file name; other files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IoError`] if the directory cannot be read, or
    /// the first parse error encountered.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Vec<QueryCatalog>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path.as_ref())? {
            let file_path = entry?.path();
            if file_path.is_file() && SourceFormat::is_supported(&file_path) {
                files.push(file_path);
            }
        }
        files.sort();

        files.iter().map(Self::from_file).collect()
    }

    /// Loads a directory with [`from_dir`](Self::from_dir) or a single file
    /// with [`from_file`](Self::from_file).
    ///
    /// # Errors
    ///
    /// Returns whatever error the chosen loader returns.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<QueryCatalog>> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path).map(|catalog| vec![catalog])
        }
    }
}
