//! Pluggable driver lookup by name.
//!
//! A [`DriverRegistry`] is built explicitly at startup: each driver crate
//! exposes a `register` function that adds its factory, and the application
//! hands the finished registry to whatever composes the store.
//!
//! # Examples
//!
//! ```
//! use sqlstore_core::{DriverRegistry, ErrorKind};
//!
//! let registry = DriverRegistry::new();
//! let err = registry.create("nonexistent-driver", "db.json").err().unwrap();
//! assert_eq!(err.kind(), ErrorKind::Config);
//! assert!(err.to_string().contains("nonexistent-driver"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::store::DataStore;

/// Constructs a store from an opaque, driver-interpreted config string.
pub type Factory = Arc<dyn Fn(&str) -> Result<Box<dyn DataStore>> + Send + Sync>;

/// Mapping from driver name to store factory.
///
/// Written during startup, then shared read-only; `&DriverRegistry` is safe
/// to use from many threads.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Factory>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`.
    ///
    /// The last registration for a name wins. Returns `true` when an earlier
    /// factory was replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&str) -> Result<Box<dyn DataStore>> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self.factories.insert(name.clone(), Arc::new(factory)).is_some();
        if replaced {
            warn!(driver = %name, "replaced previously registered driver");
        } else {
            debug!(driver = %name, "registered driver");
        }
        replaced
    }

    /// Creates a store with the driver registered under `name`.
    ///
    /// The factory's result, including any construction error, is returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DriverNotFound`] if no driver is registered
    /// under `name`.
    pub fn create(&self, name: &str, config: &str) -> Result<Box<dyn DataStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| StoreError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// Returns `true` if a driver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered driver names in sorted order.
    pub fn drivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered drivers.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no driver is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers())
            .finish()
    }
}
