//! Pooled [`DataStore`] implementation over SQLite.
//!
//! Connections come from an r2d2 pool built on `r2d2_sqlite`. Every
//! operation checks out its own connection and uses the connection's prepared
//! statement cache, so independent operations run concurrently on file
//! databases. In-memory databases use a single-connection pool so every
//! operation sees the same data.
//!
//! # Example
//!
//! ```
//! use sqlstore_core::{DataStore, Params, Query, QueryCatalog};
//! use sqlstore_sqlite::SqliteStore;
//!
//! let mut store = SqliteStore::open(":memory:").unwrap();
//! store
//!     .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
//!     .unwrap();
//!
//! let mut catalog = QueryCatalog::new("sqlite", "app");
//! catalog.insert("user.add", Query::new("users", "insert").with_columns(["name"]));
//! catalog.insert(
//!     "user.by_id",
//!     Query::new("users", "select").with_columns(["*"]).with_filters(["id"]),
//! );
//! store.prepare_catalog(catalog).unwrap();
//!
//! let id = store.insert("user.add", &Params::new().bind("name", "ada")).unwrap();
//! let row = store.get("user.by_id", &Params::new().bind("id", id)).unwrap();
//! assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("ada"));
//! ```

use std::fmt;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Statement};
use sqlstore_core::{
    CatalogSet, DataStore, Operation, Params, QueryCatalog, Result, Row, StoreError,
};
use sqlstore_db::CatalogLoader;
use tracing::{debug, info};

use crate::DRIVER_NAME;
use crate::config::SqliteConfig;
use crate::convert::{bind_params, collect_rows};
use crate::error::SqliteError;

type SqlitePool = Pool<SqliteConnectionManager>;

/// A SQLite-backed data store.
pub struct SqliteStore {
    pool: RwLock<Option<SqlitePool>>,
    catalogs: CatalogSet,
    location: String,
}

impl SqliteStore {
    /// Opens a store from a driver config string.
    ///
    /// See [`SqliteConfig::parse`] for the accepted forms.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an invalid config and
    /// [`StoreError::Execution`] if the database cannot be opened.
    pub fn open(config: &str) -> Result<Self> {
        let config = SqliteConfig::parse(config)?;
        Ok(Self::with_config(&config)?)
    }

    /// Opens a store from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot produce its first connection.
    pub fn with_config(config: &SqliteConfig) -> std::result::Result<Self, SqliteError> {
        let foreign_keys = config.foreign_keys;
        let busy_timeout = config.busy_timeout();
        let manager = if config.is_memory() {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(&config.path)
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", foreign_keys)
        });

        let mut builder = Pool::builder().max_size(config.effective_pool_size());
        if config.is_memory() {
            // A replacement connection would open a new, empty database.
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder.build(manager)?;

        let location = config.path.display().to_string();
        info!(
            driver = DRIVER_NAME,
            path = %location,
            pool_size = config.effective_pool_size(),
            "opened sqlite store"
        );

        Ok(Self {
            pool: RwLock::new(Some(pool)),
            catalogs: CatalogSet::new(DRIVER_NAME),
            location,
        })
    }

    /// Runs a script of semicolon-separated statements, e.g. table DDL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] after [`close`](DataStore::close), or
    /// [`StoreError::Execution`] if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql).map_err(SqliteError::from)?;
        Ok(())
    }

    /// Returns the database path this store was opened on.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        // Clone the handle so the lock is not held while waiting on the pool.
        let pool = self
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::Closed)?;
        Ok(pool.get().map_err(SqliteError::from)?)
    }

    /// Checks out a connection, resolves `name`, binds `args`, and hands the
    /// statement to `run`. A closed store fails before the name is resolved.
    fn run<T>(
        &self,
        name: &str,
        operation: Operation,
        args: &Params,
        run: impl FnOnce(&Connection, &mut Statement<'_>) -> std::result::Result<T, SqliteError>,
    ) -> Result<T> {
        let conn = self.connection()?;
        let sql = self.catalogs.statement(name, operation)?;
        debug!(query = name, %operation, sql, "executing statement");

        let mut stmt = conn.prepare_cached(sql).map_err(SqliteError::from)?;
        bind_params(&mut *stmt, args)?;
        Ok(run(&*conn, &mut *stmt)?)
    }
}

impl DataStore for SqliteStore {
    fn driver(&self) -> &str {
        DRIVER_NAME
    }

    fn register(&mut self, schema: &str) {
        self.catalogs.register(schema);
    }

    fn prepare(&mut self, path: &Path) -> Result<()> {
        let catalog = CatalogLoader::from_file(path)?;
        self.catalogs.attach(catalog)
    }

    fn prepare_catalog(&mut self, catalog: QueryCatalog) -> Result<()> {
        self.catalogs.attach(catalog)
    }

    fn select(&self, query: &str, args: &Params) -> Result<Vec<Row>> {
        self.run(query, Operation::Select, args, |_, stmt| collect_rows(stmt, None))
    }

    fn get(&self, query: &str, args: &Params) -> Result<Row> {
        let mut rows = self.run(query, Operation::Get, args, |_, stmt| {
            collect_rows(stmt, Some(2))
        })?;
        match rows.len() {
            0 => Err(StoreError::NoRows(query.to_string())),
            1 => Ok(rows.remove(0)),
            _ => Err(StoreError::TooManyRows(query.to_string())),
        }
    }

    fn insert(&self, query: &str, args: &Params) -> Result<i64> {
        self.run(query, Operation::Insert, args, |conn, stmt| {
            stmt.raw_execute()?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn exec(&self, query: &str, args: &Params) -> Result<u64> {
        self.run(query, Operation::Exec, args, |_, stmt| {
            Ok(stmt.raw_execute()? as u64)
        })
    }

    fn schemas(&self) -> Vec<String> {
        self.catalogs.schemas().to_vec()
    }

    fn query_count(&self) -> usize {
        self.catalogs.query_count()
    }

    fn close(&self) {
        let pool = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if pool.is_some() {
            info!(driver = DRIVER_NAME, path = %self.location, "closed sqlite store");
        }
    }

    fn is_closed(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Display for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.catalogs, f)
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .field("catalogs", &self.catalogs)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sqlstore_core::{ErrorKind, Query};

    use super::*;

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store
            .execute_batch(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, qty INTEGER);",
            )
            .unwrap();
        let mut catalog = QueryCatalog::new("sqlite", "shop");
        catalog.insert(
            "item.add",
            Query::new("items", "insert").with_columns(["name", "qty"]),
        );
        catalog.insert(
            "item.by_name",
            Query::new("items", "select")
                .with_columns(["id", "qty"])
                .with_filters(["name"]),
        );
        catalog.insert("item.all", Query::new("items", "select").with_columns(["*"]));
        catalog.insert(
            "item.restock",
            Query::new("items", "update")
                .with_columns(["qty"])
                .with_filters(["name"]),
        );
        store.prepare_catalog(catalog).unwrap();
        store
    }

    fn item(name: &str, qty: i64) -> Params {
        Params::new().bind("name", name).bind("qty", qty)
    }

    #[test]
    fn test_insert_returns_rowid() {
        let store = store();
        assert_eq!(store.insert("item.add", &item("bolt", 3)).unwrap(), 1);
        assert_eq!(store.insert("item.add", &item("nut", 5)).unwrap(), 2);
    }

    #[test]
    fn test_get_and_exec() {
        let store = store();
        store.insert("item.add", &item("bolt", 3)).unwrap();

        let changed = store.exec("item.restock", &item("bolt", 10)).unwrap();
        assert_eq!(changed, 1);

        let row = store
            .get("item.by_name", &Params::new().bind("name", "bolt"))
            .unwrap();
        assert_eq!(row.get("qty").and_then(|v| v.as_i64()), Some(10));
    }

    #[test]
    fn test_get_row_count_errors() {
        let store = store();
        let by_name = Params::new().bind("name", "bolt");
        assert!(matches!(
            store.get("item.by_name", &by_name),
            Err(StoreError::NoRows(_))
        ));

        store.insert("item.add", &item("bolt", 1)).unwrap();
        store.insert("item.add", &item("bolt", 2)).unwrap();
        let err = store.get("item.by_name", &by_name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousResult);
    }

    #[test]
    fn test_wrong_operation_is_config_error() {
        let store = store();
        let err = store.exec("item.all", &Params::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = store.insert("item.restock", &item("x", 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = store();
        assert!(!store.is_closed());
        store.close();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(
            store.select("item.all", &Params::new()),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.execute_batch("SELECT 1"), Err(StoreError::Closed)));
    }

    #[test]
    fn test_closed_store_fails_before_query_lookup() {
        let mut store = store();
        let mut broken = QueryCatalog::new("sqlite", "shop");
        broken.insert("item.bad", Query::new("items", "upsert").with_columns(["name"]));
        store.prepare_catalog(broken).unwrap();
        store.close();

        assert!(matches!(
            store.select("item.nope", &Params::new()),
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.exec("item.bad", &Params::new()),
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.exec("item.all", &Params::new()),
            Err(StoreError::Closed)
        ));
    }

    #[test]
    fn test_memory_pool_never_recycles_its_connection() {
        let store = store();
        let pool = store.pool.read().unwrap().clone().unwrap();
        assert_eq!(pool.max_size(), 1);
        assert_eq!(pool.idle_timeout(), None);
        assert_eq!(pool.max_lifetime(), None);
    }

    #[test]
    fn test_file_pool_keeps_default_lifetimes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        let pool = store.pool.read().unwrap().clone().unwrap();
        assert!(pool.idle_timeout().is_some());
        assert!(pool.max_lifetime().is_some());
    }

    #[test]
    fn test_display_summary() {
        let store = store();
        assert_eq!(
            store.to_string(),
            "driver=sqlite schemas=[shop] queries=4 state=prepared"
        );
        assert_eq!(store.location(), ":memory:");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = store();
        let conn = store.connection().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
