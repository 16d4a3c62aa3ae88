#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! All paths are relative to the project root's `data/` directory unless
//! overridden through the environment.

use std::path::{Path, PathBuf};

/// Environment variable overriding the database file location.
pub const DB_PATH_ENV: &str = "SECURECHECK_DB_PATH";

/// Environment variable overriding the table name.
pub const TABLE_ENV: &str = "SECURECHECK_TABLE";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the path of the traffic-stop `DuckDB` file.
///
/// Uses `SECURECHECK_DB_PATH` when set, otherwise
/// `data/securecheck.duckdb`.
#[must_use]
pub fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| data_dir().join("securecheck.duckdb"), PathBuf::from)
}

/// Returns the table name from `SECURECHECK_TABLE`, or the default
/// `traffic_stops`.
#[must_use]
pub fn table_name() -> String {
    std::env::var(TABLE_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| securecheck_stop_models::DEFAULT_TABLE_NAME.to_string())
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
