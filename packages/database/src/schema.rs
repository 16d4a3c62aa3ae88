//! Destination table creation and inspection.
//!
//! The table is created with `CREATE TABLE IF NOT EXISTS`, so an existing
//! table is left untouched. No migration is attempted when the column set
//! of a later load differs from the one the table was created with.

use duckdb::Connection;
use securecheck_stop_models::StopColumn;

use crate::DbError;

/// Checks that `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Table names cannot be bound as parameters, so every statement that
/// splices one into SQL text goes through this check first.
///
/// # Errors
///
/// Returns [`DbError::InvalidTableName`] if the name is empty or contains
/// anything other than ASCII letters, digits, and underscores.
pub fn validate_table_name(name: &str) -> Result<&str, DbError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest {
        Ok(name)
    } else {
        Err(DbError::InvalidTableName {
            name: name.to_string(),
        })
    }
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement for the given columns.
///
/// # Errors
///
/// Returns [`DbError::InvalidTableName`] if the table name is rejected.
pub fn create_table_sql(table: &str, columns: &[StopColumn]) -> Result<String, DbError> {
    let table = validate_table_name(table)?;

    let defs = columns
        .iter()
        .map(|c| format!("    {} {}", c.name(), c.kind().sql_type()))
        .collect::<Vec<_>>()
        .join(",\n");

    Ok(format!("CREATE TABLE IF NOT EXISTS {table} (\n{defs}\n)"))
}

/// Creates the destination table if it does not already exist.
///
/// # Errors
///
/// Returns [`DbError`] if the table name is invalid or the statement fails.
pub fn create_table_if_not_exists(
    conn: &Connection,
    table: &str,
    columns: &[StopColumn],
) -> Result<(), DbError> {
    let sql = create_table_sql(table, columns)?;
    log::debug!("Creating table if absent:\n{sql}");
    conn.execute_batch(&sql)?;
    log::info!("Table {table} is ready ({} columns)", columns.len());
    Ok(())
}

/// Returns whether a table with this name exists.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, DbError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Returns the column names of a table in declaration order.
///
/// Returns an empty list when the table does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_name = ?
         ORDER BY ordinal_position",
    )?;

    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(names)
}
