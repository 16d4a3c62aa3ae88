#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Load configuration, result, and progress types for traffic-stop
//! ingestion.

pub mod progress;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Published `SecureCheck` traffic-stop dataset.
pub const DEFAULT_CSV_URL: &str = "https://raw.githubusercontent.com/Mounesh1921/SecureCheck-A-Python-SQL-Digital-Ledger-for-Police-Post-Logs/refs/heads/main/traffic_stops_with_vehicle_number.csv";

/// Environment variable overriding the CSV source.
pub const CSV_URL_ENV: &str = "SECURECHECK_CSV_URL";

/// Configuration for a single load run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// URL (`http://`, `https://`) or local path of the CSV file.
    pub source: String,
    /// Path of the destination `DuckDB` file.
    pub db_path: PathBuf,
    /// Destination table name.
    pub table: String,
    /// Keep only the first `limit` data rows (useful for testing).
    pub limit: Option<u64>,
    /// Delete existing rows before inserting.
    pub truncate: bool,
}

/// Missing values found in one CSV column before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNulls {
    /// CSV header.
    pub column: String,
    /// Null cells in that column.
    pub nulls: u64,
}

/// Result of a completed load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadReport {
    /// Destination table name.
    pub table: String,
    /// Data rows read from the CSV (after any limit).
    pub rows_read: u64,
    /// Rows inserted into the table.
    pub rows_inserted: u64,
    /// Rows removed by truncation before the insert.
    pub rows_truncated: u64,
    /// Columns written to the table, in table order.
    pub columns: Vec<String>,
    /// Nulls per CSV column as read, before any column is dropped.
    pub null_counts: Vec<ColumnNulls>,
    /// Columns dropped because every value was null.
    pub dropped_columns: Vec<String>,
    /// CSV columns that are not part of the traffic-stop schema.
    pub ignored_columns: Vec<String>,
    /// Most frequent `search_type`, if the column survived cleaning.
    pub search_type_mode: Option<String>,
    /// Number of `search_type` nulls replaced by the mode.
    pub search_type_filled: u64,
    /// Individual values that failed conversion and were stored as null.
    pub values_coerced_to_null: u64,
    /// How long the load took.
    pub duration: Duration,
}
