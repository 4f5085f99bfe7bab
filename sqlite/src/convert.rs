//! Conversion between bind parameters / result rows and SQLite values.
//!
//! Named parameters in a prepared statement (`:name`, `@name`, `$name`) are
//! resolved against [`Params`] by bare name. Result columns are decoded into
//! JSON values keyed by column name, in select order.
//!
//! # Value mapping
//!
//! | JSON            | SQLite                  |
//! |-----------------|-------------------------|
//! | `null`          | `NULL`                  |
//! | bool            | `INTEGER` 0 / 1         |
//! | integer         | `INTEGER`               |
//! | float, big u64  | `REAL`                  |
//! | string          | `TEXT`                  |
//! | array / object  | `TEXT` (JSON encoded)   |
//!
//! Decoding is the reverse, except `BLOB` columns, which become arrays of
//! byte values so `Vec<u8>` fields deserialize.

use rusqlite::Statement;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};
use sqlstore_core::{Params, Row};

use crate::error::{Result, SqliteError};

/// Converts one JSON bind value into an owned SQLite value.
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Converts one SQLite column value into JSON.
///
/// Non-finite reals have no JSON form and decode as `null`.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidText`] for TEXT that is not valid UTF-8.
pub(crate) fn from_value_ref(column: &str, value: ValueRef<'_>) -> Result<Value> {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_owned()),
            Err(source) => {
                return Err(SqliteError::InvalidText {
                    column: column.to_owned(),
                    source,
                });
            }
        },
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    };
    Ok(value)
}

/// Binds every parameter the statement references from `params`.
///
/// Entries in `params` the statement does not reference are ignored.
///
/// # Errors
///
/// Returns [`SqliteError::MissingParameter`] for a referenced name absent
/// from `params` and [`SqliteError::PositionalParameter`] for `?` / `?NNN`
/// placeholders.
pub(crate) fn bind_params(stmt: &mut Statement<'_>, params: &Params) -> Result<()> {
    for index in 1..=stmt.parameter_count() {
        let name = match stmt.parameter_name(index) {
            Some(name) if !name.starts_with('?') => bare_name(name).to_string(),
            _ => return Err(SqliteError::PositionalParameter(index)),
        };
        let value = params
            .get(&name)
            .ok_or(SqliteError::MissingParameter(name))?;
        stmt.raw_bind_parameter(index, to_sql_value(value))?;
    }
    Ok(())
}

/// Runs a bound statement and decodes up to `limit` rows.
///
/// `None` reads every row.
pub(crate) fn collect_rows(stmt: &mut Statement<'_>, limit: Option<usize>) -> Result<Vec<Row>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.raw_query();
    let mut out = Vec::new();

    while limit.is_none_or(|max| out.len() < max) {
        let Some(sql_row) = rows.next()? else {
            break;
        };
        let mut row = Row::new();
        for (index, column) in columns.iter().enumerate() {
            let value = from_value_ref(column, sql_row.get_ref(index)?)?;
            row.push(column.as_str(), value);
        }
        out.push(row);
    }
    Ok(out)
}

fn bare_name(name: &str) -> &str {
    name.strip_prefix(&[':', '@', '$'][..]).unwrap_or(name)
}
