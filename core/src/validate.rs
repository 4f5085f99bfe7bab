//! Query catalog validation.
//!
//! Catches descriptors that would render to no statement, or to SQL with
//! suspicious identifiers, before they reach a database. Validation is
//! advisory: stores still load catalogs with issues and reject the broken
//! queries when they are executed.
//!
//! # Examples
//!
//! ```
//! use sqlstore_core::*;
//!
//! let mut catalog = QueryCatalog::new("sqlite", "app");
//! catalog.insert("users.all", Query::new("users", "select").with_columns(["*"]));
//! assert!(validate_catalog(&catalog).is_empty());
//!
//! // Unknown command renders to nothing
//! catalog.insert("users.merge", Query::new("users", "merge").with_columns(["id"]));
//! let errors = validate_catalog(&catalog);
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownCommand { .. })));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::query::ALL_COLUMNS;
use crate::{Command, Query, QueryCatalog};

/// Catalog validation errors.
///
/// Every variant names the query it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Query name is empty or whitespace-only.
    #[error("query name cannot be empty")]
    EmptyQueryName,
    /// Table is empty or whitespace-only.
    #[error("{query}: table cannot be empty")]
    EmptyTable {
        /// Query name.
        query: String,
    },
    /// Command is empty or whitespace-only.
    #[error("{query}: command cannot be empty")]
    EmptyCommand {
        /// Query name.
        query: String,
    },
    /// Command is not one of the supported SQL commands.
    #[error("{query}: unsupported command {command:?}")]
    UnknownCommand {
        /// Query name.
        query: String,
        /// Command as written.
        command: String,
    },
    /// Table, column, or filter name is not a plain SQL identifier.
    #[error("{query}: invalid identifier {identifier:?}")]
    InvalidIdentifier {
        /// Query name.
        query: String,
        /// Offending identifier.
        identifier: String,
    },
    /// `*` used where columns are bound as parameters.
    #[error("{query}: '*' is only meaningful in SELECT column lists")]
    MisplacedWildcard {
        /// Query name.
        query: String,
    },
    /// INSERT, REPLACE, or UPDATE without any assignable column.
    #[error("{query}: {command} requires at least one column")]
    MissingColumns {
        /// Query name.
        query: String,
        /// Parsed command.
        command: Command,
    },
    /// SELECT without any column.
    #[error("{query}: SELECT requires at least one column (use '*' for all)")]
    EmptySelect {
        /// Query name.
        query: String,
    },
    /// Same column listed twice in one list.
    #[error("{query}: duplicate column {column:?}")]
    DuplicateColumn {
        /// Query name.
        query: String,
        /// Duplicated column.
        column: String,
    },
}

/// Validates every query in a catalog.
///
/// Errors are reported in query-name order so output is deterministic.
pub fn validate_catalog(catalog: &QueryCatalog) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for name in catalog.names() {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyQueryName);
            continue;
        }
        if let Some(query) = catalog.get(name) {
            errors.extend(validate_query(name, query));
        }
    }
    errors
}

/// Validates a single descriptor registered under `name`.
///
/// # Examples
///
/// ```
/// use sqlstore_core::*;
///
/// let query = Query::new("users", "insert").with_columns(["*"]);
/// let errors = validate_query("users.add", &query);
/// assert!(errors.contains(&ValidationError::MisplacedWildcard {
///     query: "users.add".into(),
/// }));
/// ```
pub fn validate_query(name: &str, query: &Query) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let owned = || name.to_string();

    if query.table.trim().is_empty() {
        errors.push(ValidationError::EmptyTable { query: owned() });
    } else if !is_identifier(query.table.trim()) {
        errors.push(ValidationError::InvalidIdentifier {
            query: owned(),
            identifier: query.table.clone(),
        });
    }

    let command = if query.command.trim().is_empty() {
        errors.push(ValidationError::EmptyCommand { query: owned() });
        return errors;
    } else {
        match query.command_kind() {
            Some(command) => command,
            None => {
                errors.push(ValidationError::UnknownCommand {
                    query: owned(),
                    command: query.command.clone(),
                });
                return errors;
            }
        }
    };

    match command {
        Command::Select => {
            if query.columns.is_empty() {
                errors.push(ValidationError::EmptySelect { query: owned() });
            }
            check_columns(name, &query.columns, &mut errors);
        }
        Command::Insert | Command::Replace | Command::Update => {
            if query.columns.iter().any(|c| c == ALL_COLUMNS) {
                errors.push(ValidationError::MisplacedWildcard { query: owned() });
            }
            if query.columns.iter().all(|c| c == ALL_COLUMNS) {
                errors.push(ValidationError::MissingColumns {
                    query: owned(),
                    command,
                });
            }
            check_columns(name, &query.columns, &mut errors);
        }
        Command::Delete => {}
    }

    check_columns(name, &query.filters, &mut errors);
    errors
}

fn check_columns(name: &str, columns: &[String], errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for column in columns {
        if column == ALL_COLUMNS {
            continue;
        }
        if !is_identifier(column) {
            errors.push(ValidationError::InvalidIdentifier {
                query: name.to_string(),
                identifier: column.clone(),
            });
        } else if !seen.insert(column.as_str()) {
            errors.push(ValidationError::DuplicateColumn {
                query: name.to_string(),
                column: column.clone(),
            });
        }
    }
}

/// Returns `true` for `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_catalog() {
        let mut catalog = QueryCatalog::new("sqlite", "app");
        catalog.insert(
            "users.add",
            Query::new("users", "insert").with_columns(["name", "email"]),
        );
        catalog.insert(
            "users.rename",
            Query::new("users", "update")
                .with_columns(["name"])
                .with_filters(["id"]),
        );
        catalog.insert("users.all", Query::new("Users", "SELECT").with_columns(["*"]));
        catalog.insert("users.remove", Query::new("users", "delete").with_filters(["id"]));
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn test_empty_table_and_command() {
        let errors = validate_query("q", &Query::new("", ""));
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyTable { query: "q".into() },
                ValidationError::EmptyCommand { query: "q".into() },
            ]
        );
    }

    #[test]
    fn test_unknown_command() {
        let errors = validate_query("q", &Query::new("users", "upsert"));
        assert_eq!(
            errors,
            vec![ValidationError::UnknownCommand {
                query: "q".into(),
                command: "upsert".into(),
            }]
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        let query = Query::new("users; drop table users", "select")
            .with_columns(["id"])
            .with_filters(["name or 1=1"]);
        let errors = validate_query("q", &query);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationError::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_update_needs_columns() {
        let query = Query::new("users", "update").with_filters(["id"]);
        let errors = validate_query("q", &query);
        assert_eq!(
            errors,
            vec![ValidationError::MissingColumns {
                query: "q".into(),
                command: Command::Update,
            }]
        );
    }

    #[test]
    fn test_wildcard_in_insert() {
        let query = Query::new("users", "insert").with_columns(["*", "name"]);
        let errors = validate_query("q", &query);
        assert_eq!(
            errors,
            vec![ValidationError::MisplacedWildcard { query: "q".into() }]
        );
    }

    #[test]
    fn test_duplicate_column() {
        let query = Query::new("users", "select").with_columns(["id", "name", "id"]);
        let errors = validate_query("q", &query);
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateColumn {
                query: "q".into(),
                column: "id".into(),
            }]
        );
    }

    #[test]
    fn test_empty_select() {
        let errors = validate_query("q", &Query::new("users", "select"));
        assert_eq!(errors, vec![ValidationError::EmptySelect { query: "q".into() }]);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("users"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("Column_2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("a b"));
    }
}
