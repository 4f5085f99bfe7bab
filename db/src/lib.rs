//! Query catalog loading and store composition config.
//!
//! This crate turns query-definition files into
//! [`QueryCatalog`](sqlstore_core::QueryCatalog)s and describes how to open
//! a fully prepared store from a single config file.
//!
//! # Quick start
//!
//! ```no_run
//! use sqlstore_core::DriverRegistry;
//! use sqlstore_db::{CatalogLoader, StoreConfig};
//!
//! // Load one catalog
//! let catalog = CatalogLoader::from_file("queries/accounts.yaml").unwrap();
//! println!("{} queries for schema {}", catalog.len(), catalog.schema);
//!
//! // Open a store described by a config file
//! let registry = DriverRegistry::new();
//! let config = StoreConfig::load("store.yaml").unwrap();
//! let store = config.open(&registry).unwrap();
//! println!("{store}");
//! ```

mod config;
mod error;
mod loader;

pub use config::StoreConfig;
pub use error::{CatalogError, Result};
pub use loader::{CatalogLoader, SourceFormat};
