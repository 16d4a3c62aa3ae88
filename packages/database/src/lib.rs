#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` connection, table schema, and record storage for traffic stops.
//!
//! All statements are prepared with positional `?` placeholders. Values
//! travel as [`SqlValue`]; the only text ever spliced into SQL is a table
//! name that has passed [`schema::validate_table_name`] and the fixed
//! column names from [`securecheck_stop_models::StopColumn`].

pub mod db;
pub mod paths;
pub mod schema;
pub mod stops;

use duckdb::ToSql;
use duckdb::types::{ToSqlOutput, Value, ValueRef};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A table name that is not a plain SQL identifier.
    #[error("Invalid table name: {name:?}")]
    InvalidTableName {
        /// The rejected name.
        name: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// 64-bit integer.
    Integer(i64),
    /// Text; `DuckDB` casts it to the column type on insert.
    Text(String),
}

impl SqlValue {
    /// Wraps an optional string, mapping `None` to [`SqlValue::Null`].
    #[must_use]
    pub fn from_text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |s| Self::Text(s.to_string()))
    }

    /// Wraps an optional integer, mapping `None` to [`SqlValue::Null`].
    #[must_use]
    pub fn from_int(value: Option<i32>) -> Self {
        value.map_or(Self::Null, |v| Self::Integer(i64::from(v)))
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Integer(v) => ToSqlOutput::Owned(Value::BigInt(*v)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}
