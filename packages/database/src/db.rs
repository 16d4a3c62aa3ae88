//! Database connection utilities.

use std::path::Path;

use duckdb::{AccessMode, Config, Connection};

use crate::DbError;

/// Opens (or creates) the traffic-stop database for writing.
///
/// # Errors
///
/// Returns [`DbError`] if the data directory cannot be created or the
/// connection fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        crate::paths::ensure_dir(parent)?;
    }

    log::info!("Opening DuckDB database at {}", path.display());
    let conn = Connection::open(path)?;

    Ok(conn)
}

/// Opens an existing database in read-only mode for dashboard queries.
///
/// # Errors
///
/// Returns [`DbError`] if the file does not exist or cannot be opened.
pub fn open_read_only(path: &Path) -> Result<Connection, DbError> {
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    let conn = Connection::open_with_flags(path, config)?;
    Ok(conn)
}
