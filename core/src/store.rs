//! The driver-agnostic data store facade.
//!
//! [`DataStore`] is the object-safe interface every driver implements.
//! [`DataStoreExt`] layers typed bind arguments and destinations on top of
//! it. [`CatalogSet`] holds the schema and catalog bookkeeping that every
//! driver needs, so drivers only deal with connections.
//!
//! # Lifecycle
//!
//! A store moves through `Unregistered → Registered → Prepared → Closed`.
//! Schemas are registered and catalogs prepared while the store is still
//! exclusively owned; afterwards the store is shared (typically in an
//! [`Arc`](std::sync::Arc)) and only the `&self` operations are used.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::validate::validate_catalog;
use crate::value::{Params, Row};
use crate::{Command, Query, QueryCatalog};

/// A live database handle serving named queries from loaded catalogs.
///
/// `Display` gives a diagnostic summary (driver, schemas, query count) that
/// is safe to log; it never includes credentials.
pub trait DataStore: Send + Sync + fmt::Display {
    /// Returns the registry name of the driver backing this store.
    fn driver(&self) -> &str;

    /// Declares a logical schema this store serves. Idempotent.
    fn register(&mut self, schema: &str);

    /// Loads a query-definition file and attaches it as a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read,
    /// [`StoreError::Parse`] if it is malformed, and [`StoreError::Config`]
    /// if it cannot be attached to a schema or targets another driver.
    fn prepare(&mut self, path: &Path) -> Result<()>;

    /// Attaches an already-parsed catalog.
    ///
    /// # Errors
    ///
    /// Same attachment rules as [`prepare`](Self::prepare).
    fn prepare_catalog(&mut self, catalog: QueryCatalog) -> Result<()>;

    /// Runs a SELECT query and returns every row.
    fn select(&self, query: &str, args: &Params) -> Result<Vec<Row>>;

    /// Runs a SELECT query that must produce exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRows`] for zero rows and
    /// [`StoreError::TooManyRows`] for more than one.
    fn get(&self, query: &str, args: &Params) -> Result<Row>;

    /// Runs an INSERT or REPLACE query and returns the new row identifier.
    fn insert(&self, query: &str, args: &Params) -> Result<i64>;

    /// Runs a non-SELECT query and returns the number of affected rows.
    fn exec(&self, query: &str, args: &Params) -> Result<u64>;

    /// Returns the registered schemas in registration order.
    fn schemas(&self) -> Vec<String>;

    /// Returns the number of distinct query names across loaded catalogs.
    fn query_count(&self) -> usize;

    /// Releases the underlying connection. Later operations fail with
    /// [`StoreError::Closed`]; closing twice is a no-op.
    fn close(&self);

    /// Returns `true` once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Typed conveniences over any [`DataStore`], including trait objects.
///
/// Bind arguments are any `Serialize` value whose fields are named after the
/// statement's columns; destinations are any `DeserializeOwned` type.
///
/// # Examples
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use sqlstore_core::{DataStore, DataStoreExt};
///
/// #[derive(Serialize)]
/// struct ById { id: i64 }
///
/// #[derive(Deserialize)]
/// struct User { id: i64, name: String }
///
/// fn load(store: &dyn DataStore) -> sqlstore_core::Result<User> {
///     store.get_as("user.by_id", &ById { id: 1 })
/// }
/// ```
pub trait DataStoreExt: DataStore {
    /// [`DataStore::select`] decoding every row into `T`.
    fn select_as<T, A>(&self, query: &str, arg: &A) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let params = Params::from_serialize(arg)?;
        self.select(query, &params)?
            .into_iter()
            .map(Row::deserialize)
            .collect()
    }

    /// [`DataStore::get`] decoding the row into `T`.
    fn get_as<T, A>(&self, query: &str, arg: &A) -> Result<T>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let params = Params::from_serialize(arg)?;
        self.get(query, &params)?.deserialize()
    }

    /// [`DataStore::insert`] with a serializable bind argument.
    fn insert_from<A: Serialize + ?Sized>(&self, query: &str, arg: &A) -> Result<i64> {
        self.insert(query, &Params::from_serialize(arg)?)
    }

    /// [`DataStore::exec`] with a serializable bind argument.
    fn exec_from<A: Serialize + ?Sized>(&self, query: &str, arg: &A) -> Result<u64> {
        self.exec(query, &Params::from_serialize(arg)?)
    }
}

impl<S: DataStore + ?Sized> DataStoreExt for S {}

/// Which operation is resolving a statement.
///
/// Each operation accepts only the command class it can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`DataStore::select`]
    Select,
    /// [`DataStore::get`]
    Get,
    /// [`DataStore::insert`]
    Insert,
    /// [`DataStore::exec`]
    Exec,
}

impl Operation {
    /// Returns `true` if this operation can execute `command`.
    pub fn accepts(self, command: Command) -> bool {
        match self {
            Self::Select | Self::Get => command.returns_rows(),
            Self::Insert => command.is_insert(),
            Self::Exec => !command.returns_rows(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::Get => "get",
            Self::Insert => "insert",
            Self::Exec => "exec",
        })
    }
}

/// Lifecycle state reported by [`CatalogSet::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No schema registered yet.
    Unregistered,
    /// At least one schema registered, no catalog loaded.
    Registered,
    /// At least one catalog loaded.
    Prepared,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Prepared => "prepared",
        })
    }
}

/// Registered schemas and loaded catalogs for one store.
///
/// # Examples
///
/// ```
/// use sqlstore_core::{CatalogSet, Operation, Query, QueryCatalog};
///
/// let mut set = CatalogSet::new("sqlite");
/// set.register("app");
///
/// let mut catalog = QueryCatalog::default();
/// catalog.insert("users.all", Query::new("users", "select").with_columns(["*"]));
/// set.attach(catalog).unwrap();
///
/// let sql = set.statement("users.all", Operation::Select).unwrap();
/// assert_eq!(sql, "SELECT * FROM users");
/// ```
#[derive(Debug, Clone)]
pub struct CatalogSet {
    driver: String,
    schemas: Vec<String>,
    catalogs: Vec<QueryCatalog>,
}

impl CatalogSet {
    /// Creates an empty set owned by `driver`.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            schemas: Vec::new(),
            catalogs: Vec::new(),
        }
    }

    /// Returns the owning driver name.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Registers a schema; registering the same name again moves nothing.
    pub fn register(&mut self, schema: &str) {
        let schema = schema.trim();
        if schema.is_empty() || self.schemas.iter().any(|s| s == schema) {
            return;
        }
        debug!(driver = %self.driver, schema, "registered schema");
        self.schemas.push(schema.to_string());
    }

    /// Attaches a catalog to a schema.
    ///
    /// A catalog naming a schema is attached to it, registering it when
    /// needed. A catalog without one takes the most recently registered
    /// schema. Later catalogs shadow earlier ones on duplicate query names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the catalog targets a different
    /// driver, or if it names no schema and none is registered.
    pub fn attach(&mut self, mut catalog: QueryCatalog) -> Result<()> {
        if !catalog.driver.is_empty() && !catalog.driver.eq_ignore_ascii_case(&self.driver) {
            return Err(StoreError::Config(format!(
                "catalog for schema {:?} targets driver {:?}, store uses {:?}",
                catalog.schema, catalog.driver, self.driver
            )));
        }

        if catalog.schema.trim().is_empty() {
            match self.schemas.last() {
                Some(schema) => catalog.schema = schema.clone(),
                None => {
                    return Err(StoreError::Config(
                        "catalog names no schema and no schema is registered".to_string(),
                    ));
                }
            }
        } else {
            let schema = catalog.schema.trim().to_string();
            self.register(&schema);
            catalog.schema = schema;
        }

        for issue in validate_catalog(&catalog) {
            warn!(driver = %self.driver, schema = %catalog.schema, "{issue}");
        }

        debug!(
            driver = %self.driver,
            schema = %catalog.schema,
            queries = catalog.len(),
            "attached query catalog"
        );
        self.catalogs.push(catalog);
        Ok(())
    }

    /// Looks up a query by name, newest catalog first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueryNotFound`] if no catalog defines `name`.
    pub fn find(&self, name: &str) -> Result<&Query> {
        self.catalogs
            .iter()
            .rev()
            .find_map(|catalog| catalog.get(name))
            .ok_or_else(|| StoreError::QueryNotFound(name.to_string()))
    }

    /// Resolves a query name to executable SQL for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueryNotFound`] for unknown names and
    /// [`StoreError::Config`] if the query renders to no statement or its
    /// command does not suit `operation`. Empty statements never leave this
    /// function.
    pub fn statement(&self, name: &str, operation: Operation) -> Result<&str> {
        let query = self.find(name)?;
        let sql = query.render();
        if sql.is_empty() {
            return Err(StoreError::Config(format!(
                "query {name:?} does not render to a statement (table {:?}, command {:?})",
                query.table, query.command
            )));
        }
        // A non-empty render implies a recognized command.
        if let Some(command) = query.command_kind() {
            if !operation.accepts(command) {
                return Err(StoreError::Config(format!(
                    "query {name:?} is a {command} statement and cannot be used with {operation}"
                )));
            }
        }
        Ok(sql)
    }

    /// Returns the registered schemas in registration order.
    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Returns the loaded catalogs in load order.
    pub fn catalogs(&self) -> &[QueryCatalog] {
        &self.catalogs
    }

    /// Returns the number of distinct query names.
    pub fn query_count(&self) -> usize {
        let mut names: Vec<&str> = self
            .catalogs
            .iter()
            .flat_map(|c| c.queries.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> StoreState {
        if !self.catalogs.is_empty() {
            StoreState::Prepared
        } else if !self.schemas.is_empty() {
            StoreState::Registered
        } else {
            StoreState::Unregistered
        }
    }
}

impl fmt::Display for CatalogSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver={} schemas=[{}] queries={} state={}",
            self.driver,
            self.schemas.join(", "),
            self.query_count(),
            self.state()
        )
    }
}
