//! SQLite driver for sqlstore.
//!
//! This crate provides [`SqliteStore`], a pooled
//! [`DataStore`](sqlstore_core::DataStore) implementation over rusqlite, and
//! the glue that makes it available through a
//! [`DriverRegistry`](sqlstore_core::DriverRegistry) under the name
//! [`DRIVER_NAME`].
//!
//! # Architecture
//!
//! - **`config`**: interpretation of the driver config string
//! - **`convert`**: named parameter binding and row decoding
//! - **`store`**: the pooled store and its operations
//!
//! # Quick start
//!
//! ```no_run
//! use sqlstore_core::{DataStoreExt, DriverRegistry};
//! use sqlstore_db::StoreConfig;
//!
//! let mut registry = DriverRegistry::new();
//! sqlstore_sqlite::register(&mut registry);
//!
//! let mut config = StoreConfig::new("sqlite", "data/app.db");
//! config.schemas.push("accounts".into());
//! config.query_files.push("queries/accounts.yaml".into());
//!
//! let store = config.open(&registry).unwrap();
//! let names: Vec<String> = store
//!     .select_as::<serde_json::Value, _>("user.all", &())
//!     .unwrap()
//!     .into_iter()
//!     .map(|row| row["name"].to_string())
//!     .collect();
//! println!("{names:?}");
//! ```

mod config;
mod convert;
mod error;
mod store;

use sqlstore_core::{DataStore, DriverRegistry};

pub use config::{MEMORY, SqliteConfig};
pub use error::{Result, SqliteError};
pub use store::SqliteStore;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "sqlite";

/// Opens a boxed store from a driver config string.
///
/// This is the factory registered by [`register`].
///
/// # Errors
///
/// See [`SqliteStore::open`].
pub fn open(config: &str) -> sqlstore_core::Result<Box<dyn DataStore>> {
    Ok(Box::new(SqliteStore::open(config)?))
}

/// Registers this driver in `registry` under [`DRIVER_NAME`].
///
/// Returns `true` if an earlier registration was replaced.
pub fn register(registry: &mut DriverRegistry) -> bool {
    registry.register(DRIVER_NAME, open)
}
