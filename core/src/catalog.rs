//! Named collections of query descriptors.
//!
//! A [`QueryCatalog`] is what one query-definition source deserializes into:
//! the driver it was written for, the schema it serves, and the queries keyed
//! by application-chosen names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Query;

/// Queries available to one logical schema.
///
/// Populated once at load time and read-only afterwards, apart from each
/// descriptor's own statement cache.
///
/// # Examples
///
/// ```
/// use sqlstore_core::{Query, QueryCatalog};
///
/// let mut catalog = QueryCatalog::new("sqlite", "accounts");
/// catalog.insert("user.by_id", Query::new("users", "select")
///     .with_columns(["*"])
///     .with_filters(["id"]));
///
/// assert_eq!(catalog.len(), 1);
/// let query = catalog.get("user.by_id").unwrap();
/// assert_eq!(query.render(), "SELECT * FROM users WHERE id = :id");
/// ```
///
/// Unknown keys are rejected and `queries` must be present, so a misspelled
/// source fails to load instead of yielding an empty catalog. Capitalized
/// keys (`Driver`, `Schema`, `Query`) are accepted for older definition files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryCatalog {
    /// Driver this catalog was written for; empty means any driver.
    #[serde(default, alias = "Driver")]
    pub driver: String,
    /// Logical schema the catalog serves; empty means "the current schema".
    #[serde(default, alias = "Schema")]
    pub schema: String,
    /// Query descriptors keyed by query name.
    #[serde(alias = "query", alias = "Query", alias = "Queries")]
    pub queries: HashMap<String, Query>,
}

impl QueryCatalog {
    /// Creates an empty catalog for the given driver and schema.
    pub fn new(driver: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            schema: schema.into(),
            queries: HashMap::new(),
        }
    }

    /// Adds a query, replacing any existing query with the same name.
    pub fn insert(&mut self, name: impl Into<String>, query: Query) -> Option<Query> {
        self.queries.insert(name.into(), query)
    }

    /// Looks up a query by name.
    pub fn get(&self, name: &str) -> Option<&Query> {
        self.queries.get(name)
    }

    /// Returns `true` if the catalog defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    /// Returns the number of queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns `true` if the catalog defines no queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns the query names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterates over `(name, query)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Query)> {
        self.queries.iter().map(|(name, query)| (name.as_str(), query))
    }
}
