//! Bind arguments and result rows.
//!
//! Values travel as [`serde_json::Value`] so any `Serialize` struct can act
//! as a bind argument and any `Deserialize` struct can act as a destination.
//! Drivers convert between these values and their native column types.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Named bind parameters for one statement execution.
///
/// Keys are the bare column names (no `:` prefix) and are matched
/// case-sensitively against the statement's placeholders.
///
/// # Examples
///
/// ```
/// use sqlstore_core::Params;
///
/// let params = Params::new().bind("id", 7).bind("name", "ada");
/// assert_eq!(params.get("id"), Some(&serde_json::json!(7)));
/// assert!(params.get("ID").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Adds or replaces a parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builds parameters from the fields of any serializable struct or map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Bind`] if `arg` does not serialize to an object.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde::Serialize;
    /// use sqlstore_core::Params;
    ///
    /// #[derive(Serialize)]
    /// struct NewUser<'a> {
    ///     name: &'a str,
    ///     email: &'a str,
    /// }
    ///
    /// let params = Params::from_serialize(&NewUser { name: "ada", email: "ada@example.com" }).unwrap();
    /// assert_eq!(params.len(), 2);
    /// assert!(Params::from_serialize(&42).is_err());
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(arg: &T) -> Result<Self> {
        match serde_json::to_value(arg) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(Value::Null) => Ok(Self::new()),
            Ok(other) => Err(StoreError::Bind(format!(
                "expected a struct or map with named fields, got {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(StoreError::Bind(e.to_string())),
        }
    }

    /// Looks up a parameter by its bare name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns `true` if the parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no parameters are bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One decoded result row, keyed by column name in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Appends a column value. Drivers call this while decoding.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Looks up a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Returns the column names in select order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the row and returns its column map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Decodes the row into a destination type by column name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if a required field is missing or has
    /// an incompatible type.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde::Deserialize;
    /// use sqlstore_core::Row;
    ///
    /// #[derive(Deserialize)]
    /// struct User {
    ///     id: i64,
    ///     name: String,
    /// }
    ///
    /// let mut row = Row::new();
    /// row.push("id", 1.into());
    /// row.push("name", "ada".into());
    /// let user: User = row.deserialize().unwrap();
    /// assert_eq!(user.id, 1);
    /// assert_eq!(user.name, "ada");
    /// ```
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0)).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
