//! Driver-agnostic data store interface and SQL statement construction.
//!
//! This crate defines the pieces every sqlstore driver shares:
//!
//! - [`Query`]: a declarative `{table, command, columns, filters}` record
//!   that renders (and caches) SQL with named `:column` placeholders.
//! - [`QueryCatalog`]: the named queries loaded for one logical schema.
//! - [`DataStore`]: the facade drivers implement (`select`, `get`,
//!   `insert`, `exec`, lifecycle), with typed helpers in [`DataStoreExt`].
//! - [`DriverRegistry`]: an explicit name → factory map used to build stores.
//! - [`StoreError`]: the error taxonomy, classified by [`ErrorKind`].
//!
//! Validation ([`validate_catalog`]) reports descriptors that would render
//! to no statement or that use identifiers unsafe to splice into SQL.
//!
//! # Example
//!
//! ```
//! use sqlstore_core::*;
//!
//! let mut catalog = QueryCatalog::new("sqlite", "accounts");
//! catalog.insert(
//!     "user.rename",
//!     Query::new("Users", "update").with_columns(["name"]).with_filters(["id"]),
//! );
//!
//! let query = catalog.get("user.rename").unwrap();
//! assert_eq!(query.render(), "UPDATE users SET name = :name WHERE id = :id");
//! assert_eq!(query.parameters(), vec!["name", "id"]);
//! assert!(validate_catalog(&catalog).is_empty());
//! ```

mod catalog;
mod error;
mod query;
mod registry;
mod store;
mod validate;
mod value;

pub use catalog::QueryCatalog;
pub use error::{BoxError, ErrorKind, Result, StoreError};
pub use query::{ALL_COLUMNS, Command, Query};
pub use registry::{DriverRegistry, Factory};
pub use store::{CatalogSet, DataStore, DataStoreExt, Operation, StoreState};
pub use validate::{ValidationError, validate_catalog, validate_query};
pub use value::{Params, Row};
