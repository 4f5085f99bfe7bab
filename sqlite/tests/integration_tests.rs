//! End-to-end tests for the sqlite driver through the registry and config.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use sqlstore_core::{
    DataStore, DataStoreExt, DriverRegistry, ErrorKind, Params, StoreError,
};
use sqlstore_db::StoreConfig;
use sqlstore_sqlite::{DRIVER_NAME, SqliteStore};
use tempfile::TempDir;

const ACCOUNTS_YAML: &str = r#"
driver: sqlite
schema: accounts
queries:
  user.add:
    table: users
    command: insert
    columns: [name, email, active]
  user.all:
    table: users
    command: select
    columns: ["*"]
  user.by_email:
    table: users
    command: select
    columns: [id, name, email, active]
    filters: [email]
  user.by_name:
    table: users
    command: select
    columns: [id, name, email, active]
    filters: [name]
  user.rename:
    table: users
    command: update
    columns: [name]
    filters: [id]
  user.purge:
    table: users
    command: delete
    filters: [active]
  user.broken:
    table: users
    command: upsert
    columns: [name]
"#;

const SCHEMA_SQL: &str = "CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);";

#[derive(Debug, Serialize)]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    active: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
    email: String,
    active: i64,
}

fn write_catalog(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("accounts.yaml");
    std::fs::write(&path, ACCOUNTS_YAML).unwrap();
    path
}

/// Opens a file-backed store with the accounts catalog and table.
fn open_store(dir: &TempDir) -> SqliteStore {
    let db = dir.path().join("app.db");
    let mut store = SqliteStore::open(db.to_str().unwrap()).unwrap();
    store.execute_batch(SCHEMA_SQL).unwrap();
    store.prepare(&write_catalog(dir.path())).unwrap();
    store
}

fn add(store: &dyn DataStore, name: &str, email: &str, active: bool) -> i64 {
    store
        .insert_from("user.add", &NewUser { name, email, active })
        .unwrap()
}

#[test]
fn test_prepare_registers_catalog_schema() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert_eq!(store.schemas(), vec!["accounts"]);
    assert_eq!(store.query_count(), 7);
    assert_eq!(store.driver(), DRIVER_NAME);
}

#[test]
fn test_insert_and_typed_reads() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let ada = add(&store, "ada", "ada@example.com", true);
    let bob = add(&store, "bob", "bob@example.com", false);
    assert_eq!((ada, bob), (1, 2));

    let user: User = store
        .get_as("user.by_email", &Params::new().bind("email", "bob@example.com"))
        .unwrap();
    assert_eq!(
        user,
        User {
            id: 2,
            name: "bob".into(),
            email: "bob@example.com".into(),
            active: 0,
        }
    );

    let all: Vec<User> = store.select_as("user.all", &()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "ada");
}

#[test]
fn test_get_distinguishes_row_counts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let by_name = Params::new().bind("name", "ada");

    let err = store.get("user.by_name", &by_name).unwrap_err();
    assert!(matches!(err, StoreError::NoRows(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    add(&store, "ada", "a1@example.com", true);
    assert!(store.get("user.by_name", &by_name).is_ok());

    add(&store, "ada", "a2@example.com", true);
    let err = store.get("user.by_name", &by_name).unwrap_err();
    assert!(matches!(err, StoreError::TooManyRows(_)));
}

#[test]
fn test_exec_reports_affected_rows() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let id = add(&store, "ada", "ada@example.com", true);
    add(&store, "bob", "bob@example.com", false);
    add(&store, "cy", "cy@example.com", false);

    let renamed = store
        .exec("user.rename", &Params::new().bind("id", id).bind("name", "lovelace"))
        .unwrap();
    assert_eq!(renamed, 1);

    let purged = store
        .exec("user.purge", &Params::new().bind("active", false))
        .unwrap();
    assert_eq!(purged, 2);

    let rows = store.select("user.all", &Params::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name").and_then(|v| v.as_str()),
        Some("lovelace")
    );
}

#[test]
fn test_unknown_and_invalid_queries() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let err = store.select("user.nope", &Params::new()).unwrap_err();
    assert!(matches!(err, StoreError::QueryNotFound(ref name) if name == "user.nope"));

    // Unknown command renders to nothing and must never reach the database.
    let err = store
        .exec("user.broken", &Params::new().bind("name", "x"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_missing_bind_parameter() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let err = store
        .insert("user.add", &Params::new().bind("name", "ada"))
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingParameter(ref name) if name == "email"));
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[test]
fn test_database_errors_are_execution_errors() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("empty.db");
    let mut store = SqliteStore::open(db.to_str().unwrap()).unwrap();
    store.prepare(&write_catalog(dir.path())).unwrap();

    // Table was never created.
    let err = store.select("user.all", &Params::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[test]
fn test_concurrent_reads_share_one_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    for i in 0..10 {
        add(&store, &format!("user{i}"), &format!("u{i}@example.com"), true);
    }

    let store: Arc<dyn DataStore> = Arc::new(store);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let email = format!("u{i}@example.com");
                let row = store
                    .get("user.by_email", &Params::new().bind("email", email))
                    .unwrap();
                let all = store.select("user.all", &Params::new()).unwrap();
                (row.get("id").and_then(|v| v.as_i64()), all.len())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (id, total) = handle.join().unwrap();
        assert_eq!(id, Some(i as i64 + 1));
        assert_eq!(total, 10);
    }
}

#[test]
fn test_close_rejects_later_operations() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.close();
    assert!(store.is_closed());
    let err = store.select("user.all", &Params::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
}

#[test]
fn test_registry_creates_sqlite_stores() {
    let mut registry = DriverRegistry::new();
    assert!(!sqlstore_sqlite::register(&mut registry));
    assert!(registry.contains(DRIVER_NAME));

    let store = registry.create(DRIVER_NAME, ":memory:").unwrap();
    assert_eq!(store.driver(), "sqlite");
    assert_eq!(store.to_string(), "driver=sqlite schemas=[] queries=0 state=unregistered");

    let err = registry.create("postgres", "host=db").err().unwrap();
    assert!(matches!(err, StoreError::DriverNotFound(ref name) if name == "postgres"));

    let err = registry.create(DRIVER_NAME, "").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_store_config_open_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("app.db");
    create_users_table(&db);
    std::fs::create_dir(dir.path().join("queries")).unwrap();
    std::fs::write(dir.path().join("queries/accounts.yaml"), ACCOUNTS_YAML).unwrap();

    let config_path = dir.path().join("store.yaml");
    std::fs::write(
        &config_path,
        format!(
            "driver: sqlite\nconfig: {}\nschemas: [accounts, audit]\nquery_files: [queries/accounts.yaml]\n",
            db.display()
        ),
    )
    .unwrap();

    let mut registry = DriverRegistry::new();
    sqlstore_sqlite::register(&mut registry);
    let store = StoreConfig::load(&config_path)
        .unwrap()
        .open(&registry)
        .unwrap();

    assert_eq!(store.schemas(), vec!["accounts", "audit"]);
    let id = add(store.as_ref(), "ada", "ada@example.com", true);
    let row = store
        .get("user.by_email", &Params::new().bind("email", "ada@example.com"))
        .unwrap();
    assert_eq!(row.get("id").and_then(|v| v.as_i64()), Some(id));
}

#[test]
fn test_settings_file_config() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("sqlite.json");
    std::fs::write(&settings, r#"{"path": "data.db", "pool_size": 2}"#).unwrap();

    let store = SqliteStore::open(settings.to_str().unwrap()).unwrap();
    store.execute_batch(SCHEMA_SQL).unwrap();
    assert!(dir.path().join("data.db").exists());
}

fn create_users_table(db: &Path) {
    let store = SqliteStore::open(db.to_str().unwrap()).unwrap();
    store.execute_batch(SCHEMA_SQL).unwrap();
    store.close();
}
