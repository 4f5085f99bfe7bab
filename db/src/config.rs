//! Store composition config.
//!
//! Describes which driver to open, the driver's config string, the schemas
//! to register, and the query files to prepare, so an application can build
//! a ready-to-use store from one file.
//!
//! # Example YAML
//!
//! ```yaml
//! driver: sqlite
//! config: data/app.db
//! schemas:
//!   - accounts
//! query_files:
//!   - queries/accounts.yaml
//! ```

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sqlstore_core::{DataStore, DriverRegistry};
use tracing::info;

use crate::error::Result;
use crate::loader::{CatalogLoader, SourceFormat};

/// Everything needed to open and prepare a store.
///
/// # Examples
///
/// ```
/// use sqlstore_db::StoreConfig;
///
/// let config: StoreConfig = serde_yaml::from_str(r#"
/// driver: sqlite
/// config: ":memory:"
/// schemas: [accounts]
/// "#).unwrap();
/// assert_eq!(config.driver, "sqlite");
/// assert!(config.query_files.is_empty());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Registry name of the driver.
    pub driver: String,
    /// Opaque driver config (DSN, path, or settings file).
    #[serde(default)]
    pub config: String,
    /// Schemas to register, in order.
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Query-definition files, or directories of them, to prepare in order.
    #[serde(default)]
    pub query_files: Vec<PathBuf>,
}

impl StoreConfig {
    /// Creates a config with no schemas and no query files.
    pub fn new(driver: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            config: config.into(),
            schemas: Vec::new(),
            query_files: Vec::new(),
        }
    }

    /// Loads a config from a JSON or YAML file, chosen by extension.
    ///
    /// Relative query file paths are resolved against the config file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CatalogError::IoError) if the file cannot
    /// be read, [`UnsupportedFormat`](crate::CatalogError::UnsupportedFormat)
    /// for unknown extensions, or a JSON/YAML error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut config: Self = match format {
            SourceFormat::Json => serde_json::from_reader(reader)?,
            SourceFormat::Yaml => serde_yaml::from_reader(reader)?,
        };

        if let Some(base) = path.parent() {
            for file in &mut config.query_files {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
        Ok(config)
    }

    /// Creates the store through `registry`, registers every schema, and
    /// prepares every query file, in order.
    ///
    /// A directory entry prepares each catalog in it, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns the first error from driver creation or preparation.
    pub fn open(&self, registry: &DriverRegistry) -> sqlstore_core::Result<Box<dyn DataStore>> {
        let mut store = registry.create(&self.driver, &self.config)?;
        for schema in &self.schemas {
            store.register(schema);
        }
        for file in &self.query_files {
            if file.is_dir() {
                for catalog in CatalogLoader::from_dir(file)? {
                    store.prepare_catalog(catalog)?;
                }
            } else {
                store.prepare(file)?;
            }
        }
        info!(store = %store, "opened data store");
        Ok(store)
    }
}
