//! Declarative query descriptors and SQL statement rendering.
//!
//! A [`Query`] names a table, a command, the columns it touches, and the
//! columns it filters on. [`Query::render`] turns that record into SQL text
//! with named `:column` placeholders and caches the result.
//!
//! # Examples
//!
//! ```
//! use sqlstore_core::Query;
//!
//! let query = Query::new("Users", "update")
//!     .with_columns(["email"])
//!     .with_filters(["id"]);
//! assert_eq!(query.render(), "UPDATE users SET email = :email WHERE id = :id");
//! ```

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Column sentinel meaning "all columns".
pub const ALL_COLUMNS: &str = "*";

/// SQL commands a [`Query`] can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `INSERT INTO ... VALUES (...)`
    Insert,
    /// `REPLACE INTO ... VALUES (...)`
    Replace,
    /// `SELECT ... FROM ...`
    Select,
    /// `UPDATE ... SET ...`
    Update,
    /// `DELETE FROM ...`
    Delete,
}

impl Command {
    /// Parses a command name, ignoring ASCII case and surrounding whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlstore_core::Command;
    ///
    /// assert_eq!(Command::parse("select"), Some(Command::Select));
    /// assert_eq!(Command::parse(" Replace "), Some(Command::Replace));
    /// assert_eq!(Command::parse("MERGE"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "REPLACE" => Some(Self::Replace),
            "SELECT" => Some(Self::Select),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the uppercase SQL keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Replace => "REPLACE",
            Self::Select => "SELECT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` for commands that produce result rows.
    pub fn returns_rows(self) -> bool {
        self == Self::Select
    }

    /// Returns `true` for commands that create a row and yield an identifier.
    pub fn is_insert(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named SQL operation described by its parts.
///
/// The public fields are the declarative description; the rendered statement
/// is computed on the first successful [`render`](Self::render) and never
/// recomputed afterwards, so mutate a descriptor only before it is rendered.
///
/// Descriptors deserialize from query-definition sources:
///
/// ```
/// use sqlstore_core::Query;
///
/// let query: Query = serde_json::from_str(
///     r#"{"table": "users", "command": "select", "columns": ["*"]}"#,
/// ).unwrap();
/// assert_eq!(query.render(), "SELECT * FROM users");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Query {
    /// Target table; lowercased when rendered.
    #[serde(alias = "Table")]
    pub table: String,
    /// SQL command; matched case-insensitively.
    #[serde(alias = "Command")]
    pub command: String,
    /// Columns to insert, select, or assign, in order.
    #[serde(default, alias = "Columns")]
    pub columns: Vec<String>,
    /// Columns joined into `AND`ed equality predicates, in order.
    #[serde(default, alias = "Filters")]
    pub filters: Vec<String>,
    #[serde(skip)]
    statement: OnceLock<String>,
}

impl Query {
    /// Creates a descriptor with no columns and no filters.
    pub fn new(table: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    /// Replaces the column list.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the filter list.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the lowercase table name.
    pub fn table_name(&self) -> String {
        self.table.to_lowercase()
    }

    /// Returns the parsed command, or `None` if it is empty or unrecognized.
    pub fn command_kind(&self) -> Option<Command> {
        Command::parse(&self.command)
    }

    /// Returns the bind names the rendered statement references, in order.
    ///
    /// Duplicates are kept; a column that is both assigned and filtered on
    /// appears twice but binds to the same value.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlstore_core::Query;
    ///
    /// let query = Query::new("users", "update")
    ///     .with_columns(["name", "*"])
    ///     .with_filters(["id"]);
    /// assert_eq!(query.parameters(), vec!["name", "id"]);
    /// ```
    pub fn parameters(&self) -> Vec<&str> {
        let assigned: Vec<&str> = match self.command_kind() {
            Some(Command::Insert | Command::Replace | Command::Update) => {
                self.assignable_columns().collect()
            }
            _ => Vec::new(),
        };
        assigned
            .into_iter()
            .chain(self.filters.iter().map(String::as_str))
            .collect()
    }

    /// Returns the SQL statement for this descriptor.
    ///
    /// An empty string means "no statement": the table or command is empty
    /// or the command is not one of `INSERT`, `REPLACE`, `SELECT`, `UPDATE`,
    /// `DELETE`. Empty results are not cached. The first non-empty result is
    /// published once and returned unchanged on every later call, even from
    /// other threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlstore_core::Query;
    ///
    /// let insert = Query::new("Users", "INSERT").with_columns(["name", "email"]);
    /// assert_eq!(
    ///     insert.render(),
    ///     "INSERT INTO users (name, email) VALUES (:name, :email)"
    /// );
    ///
    /// let delete = Query::new("users", "delete").with_filters(["id"]);
    /// assert_eq!(delete.render(), "DELETE FROM users WHERE id = :id");
    ///
    /// assert_eq!(Query::new("users", "truncate").render(), "");
    /// ```
    pub fn render(&self) -> &str {
        if let Some(statement) = self.statement.get() {
            return statement;
        }
        match self.build() {
            Some(statement) => self.statement.get_or_init(|| statement),
            None => "",
        }
    }

    /// Returns `true` once a non-empty statement has been cached.
    pub fn is_rendered(&self) -> bool {
        self.statement.get().is_some()
    }

    fn build(&self) -> Option<String> {
        let table = self.table_name();
        if table.trim().is_empty() {
            return None;
        }
        let command = self.command_kind()?;

        let mut sql = match command {
            Command::Insert | Command::Replace => format!(
                "{command} INTO {table} ({}) VALUES ({})",
                self.columns.join(", "),
                self.params()
            ),
            Command::Select => format!("SELECT {} FROM {table}", self.columns.join(", ")),
            Command::Update => format!("UPDATE {table} SET {}", self.setters()),
            Command::Delete => format!("DELETE FROM {table}"),
        };

        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions());
        }

        Some(sql)
    }

    fn assignable_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|column| *column != ALL_COLUMNS)
    }

    fn params(&self) -> String {
        self.assignable_columns()
            .map(|column| format!(":{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn setters(&self) -> String {
        self.assignable_columns()
            .map(|column| format!("{column} = :{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // Only ANDed equality is supported.
    fn conditions(&self) -> String {
        self.filters
            .iter()
            .map(|column| format!("{column} = :{column}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_columns() {
        let query = Query::new("users", "select").with_columns(["*"]);
        assert_eq!(query.render(), "SELECT * FROM users");
    }

    #[test]
    fn test_insert_lowercases_table() {
        let query = Query::new("Users", "INSERT").with_columns(["name", "email"]);
        assert_eq!(
            query.render(),
            "INSERT INTO users (name, email) VALUES (:name, :email)"
        );
    }

    #[test]
    fn test_table_name_only_lowercases() {
        assert_eq!(Query::new("Audit_Log", "select").table_name(), "audit_log");
        assert_eq!(Query::new(" Users ", "select").table_name(), " users ");
    }

    #[test]
    fn test_replace_uses_replace_keyword() {
        let query = Query::new("users", "replace").with_columns(["id", "name"]);
        assert_eq!(
            query.render(),
            "REPLACE INTO users (id, name) VALUES (:id, :name)"
        );
    }

    #[test]
    fn test_update_with_filter() {
        let query = Query::new("users", "update")
            .with_columns(["email"])
            .with_filters(["id"]);
        assert_eq!(
            query.render(),
            "UPDATE users SET email = :email WHERE id = :id"
        );
    }

    #[test]
    fn test_update_skips_all_columns_sentinel() {
        let query = Query::new("users", "update")
            .with_columns(["*", "email", "name"])
            .with_filters(["id"]);
        assert_eq!(
            query.render(),
            "UPDATE users SET email = :email, name = :name WHERE id = :id"
        );
    }

    #[test]
    fn test_delete_ignores_columns() {
        let query = Query::new("users", "delete")
            .with_columns(["name"])
            .with_filters(["id"]);
        assert_eq!(query.render(), "DELETE FROM users WHERE id = :id");
    }

    #[test]
    fn test_delete_without_filters_is_unconditional() {
        assert_eq!(Query::new("users", "delete").render(), "DELETE FROM users");
    }

    #[test]
    fn test_filters_are_anded_in_order() {
        let query = Query::new("users", "select")
            .with_columns(["id", "name"])
            .with_filters(["b", "a"]);
        assert_eq!(
            query.render(),
            "SELECT id, name FROM users WHERE b = :b AND a = :a"
        );
    }

    #[test]
    fn test_unknown_command_renders_empty() {
        let query = Query::new("users", "upsert").with_columns(["id"]);
        assert_eq!(query.render(), "");
        assert!(!query.is_rendered());
    }

    #[test]
    fn test_empty_table_or_command_renders_empty() {
        assert_eq!(Query::new("", "select").with_columns(["*"]).render(), "");
        assert_eq!(Query::new("users", "").with_columns(["*"]).render(), "");
        assert_eq!(Query::new("   ", "delete").render(), "");
    }

    #[test]
    fn test_render_is_memoized() {
        let mut query = Query::new("users", "select").with_columns(["id"]);
        let first = query.render().to_string();
        assert!(query.is_rendered());

        query.columns.push("name".into());
        query.table = "accounts".into();
        assert_eq!(query.render(), first);
    }

    #[test]
    fn test_empty_render_is_not_cached() {
        let mut query = Query::new("users", "bogus").with_columns(["id"]);
        assert_eq!(query.render(), "");

        query.command = "select".into();
        assert_eq!(query.render(), "SELECT id FROM users");
    }

    #[test]
    fn test_parameters_for_each_command() {
        let insert = Query::new("t", "insert").with_columns(["a", "*", "b"]);
        assert_eq!(insert.parameters(), vec!["a", "b"]);

        let select = Query::new("t", "select")
            .with_columns(["a", "b"])
            .with_filters(["c"]);
        assert_eq!(select.parameters(), vec!["c"]);

        let delete = Query::new("t", "delete").with_filters(["id", "owner"]);
        assert_eq!(delete.parameters(), vec!["id", "owner"]);
    }

    #[test]
    fn test_placeholder_case_follows_column_name() {
        let query = Query::new("USERS", "insert").with_columns(["UserName"]);
        assert_eq!(
            query.render(),
            "INSERT INTO users (UserName) VALUES (:UserName)"
        );
    }

    #[test]
    fn test_clone_keeps_cached_statement() {
        let query = Query::new("users", "select").with_columns(["id"]);
        query.render();
        let copy = query.clone();
        assert!(copy.is_rendered());
        assert_eq!(copy.render(), "SELECT id FROM users");
    }

    #[test]
    fn test_deserialize_skips_cache() {
        let query: Query =
            serde_json::from_str(r#"{"table":"users","command":"DELETE","filters":["id"]}"#)
                .unwrap();
        assert!(!query.is_rendered());
        assert!(query.columns.is_empty());
        assert_eq!(query.render(), "DELETE FROM users WHERE id = :id");
    }

    #[test]
    fn test_concurrent_first_render() {
        let query = Query::new("users", "update")
            .with_columns(["email"])
            .with_filters(["id"]);
        let rendered: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| query.render().to_string()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(rendered.iter().all(|s| s == query.render()));
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Insert.to_string(), "INSERT");
        assert!(Command::Select.returns_rows());
        assert!(Command::Replace.is_insert());
        assert!(!Command::Update.is_insert());
    }
}
