#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loads the traffic-stop CSV into a `DuckDB` table.
//!
//! The pipeline runs in a fixed order: fetch the whole CSV, clean it in
//! memory (drop all-null columns, mode-fill `search_type`, convert values),
//! open the database, create the table if absent, optionally truncate, and
//! insert every row inside one transaction.

pub mod convert;
pub mod fetch;
pub mod frame;
pub mod interactive;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use duckdb::Connection;
use securecheck_database::{DbError, db, schema, stops};
use securecheck_ingest_models::progress::{LoadStage, ProgressCallback};
use securecheck_ingest_models::{LoadOptions, LoadReport};
use securecheck_stop_models::{StopColumn, TrafficStopRecord};

use crate::convert::ColumnLayout;
use crate::frame::StopFrame;

/// Errors that can occur while loading traffic stops.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error reading a local CSV file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Database connection or write failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The CSV has no header row.
    #[error("CSV file contains no header row")]
    MissingHeader,

    /// None of the CSV headers is a traffic-stop column.
    #[error("CSV has no traffic-stop columns (found: {})", headers.join(", "))]
    NoKnownColumns {
        /// Headers that were found.
        headers: Vec<String>,
    },

    /// The blocking database task panicked or was cancelled.
    #[error("Load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Returns the CSV source from `SECURECHECK_CSV_URL`, or the published
/// dataset URL.
#[must_use]
pub fn default_source() -> String {
    std::env::var(securecheck_ingest_models::CSV_URL_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| securecheck_ingest_models::DEFAULT_CSV_URL.to_string())
}

/// Cleaned, converted rows ready to be written.
#[derive(Debug, Clone)]
pub struct PreparedLoad {
    /// Columns written to the table, in table order.
    pub columns: Vec<StopColumn>,
    /// Converted records, one per CSV row.
    pub records: Vec<TrafficStopRecord>,
    /// Cleaning statistics; database counts are filled in by [`write`].
    pub report: LoadReport,
}

/// Cleans a parsed CSV and converts its rows into records.
///
/// Counts nulls per column, drops all-null columns, replaces every null
/// `search_type` with the column's mode, and converts each value for its
/// column kind (failures become null).
///
/// # Errors
///
/// Returns [`IngestError::NoKnownColumns`] if no traffic-stop column
/// survives cleaning.
pub fn prepare(mut frame: StopFrame) -> Result<PreparedLoad, IngestError> {
    let null_counts = frame.null_counts();
    for c in null_counts.iter().filter(|c| c.nulls > 0) {
        log::info!("Column {} has {} null values", c.column, c.nulls);
    }

    let dropped_columns = frame.drop_all_null_columns();

    let search_column = StopColumn::SearchType.name();
    let search_type_mode = frame.mode(search_column);
    let search_type_filled = search_type_mode
        .as_deref()
        .map_or(0, |mode| frame.fill_nulls(search_column, mode));
    if let Some(mode) = &search_type_mode {
        log::info!("Filled {search_type_filled} null search_type values with mode {mode:?}");
    }

    let (layout, ignored_columns) = ColumnLayout::from_headers(&frame.headers);
    if layout.is_empty() {
        return Err(IngestError::NoKnownColumns {
            headers: frame.headers,
        });
    }
    if !ignored_columns.is_empty() {
        log::warn!("Ignoring unknown CSV columns: {}", ignored_columns.join(", "));
    }

    let mut values_coerced_to_null = 0;
    let records: Vec<TrafficStopRecord> = frame
        .rows
        .iter()
        .map(|row| {
            let (record, coerced) = layout.to_record(row);
            values_coerced_to_null += coerced;
            record
        })
        .collect();
    if values_coerced_to_null > 0 {
        log::warn!("{values_coerced_to_null} values failed conversion and were stored as null");
    }

    let columns = layout.columns();
    let report = LoadReport {
        rows_read: records.len() as u64,
        columns: columns.iter().map(|c| c.name().to_string()).collect(),
        null_counts,
        dropped_columns,
        ignored_columns,
        search_type_mode,
        search_type_filled,
        values_coerced_to_null,
        ..LoadReport::default()
    };

    Ok(PreparedLoad {
        columns,
        records,
        report,
    })
}

/// Creates the table if absent, optionally truncates it, and inserts every
/// prepared record in a single transaction.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the table name is invalid or any
/// statement fails. Nothing from this call is committed in that case.
pub fn write(
    conn: &mut Connection,
    prepared: PreparedLoad,
    table: &str,
    truncate: bool,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadReport, IngestError> {
    let PreparedLoad {
        columns,
        records,
        mut report,
    } = prepared;

    progress.stage(LoadStage::PreparingTable, table);
    schema::create_table_if_not_exists(conn, table, &columns)?;

    if truncate {
        report.rows_truncated = stops::truncate(conn, table)?;
    }

    progress.stage(LoadStage::Inserting, table);
    progress.rows_total(records.len() as u64);
    report.rows_inserted =
        stops::insert_records(conn, table, &columns, &records, |n| progress.rows_inserted(n))?;

    report.table = table.to_string();
    progress.done(&report);
    Ok(report)
}

/// Runs the clean-and-write steps against an open connection.
///
/// # Errors
///
/// Returns [`IngestError`] if cleaning or any database statement fails.
pub fn load_frame(
    conn: &mut Connection,
    frame: StopFrame,
    table: &str,
    truncate: bool,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadReport, IngestError> {
    let start = Instant::now();
    schema::validate_table_name(table)?;
    let prepared = prepare(frame)?;
    let mut report = write(conn, prepared, table, truncate, progress)?;
    report.duration = start.elapsed();
    Ok(report)
}

/// Fetches the CSV named by `options.source` and loads it into the database.
///
/// The database is opened only after the whole CSV has been fetched and
/// cleaned. A connection failure aborts the load before any row is written.
///
/// # Errors
///
/// Returns [`IngestError`] if fetching, parsing, connecting, or writing
/// fails.
pub async fn load(
    options: &LoadOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<LoadReport, IngestError> {
    let start = Instant::now();
    schema::validate_table_name(&options.table)?;

    progress.stage(LoadStage::Fetching, &options.source);
    let bytes = fetch::fetch_csv(&options.source).await?;
    progress.stage(LoadStage::Cleaning, &options.source);
    let frame = StopFrame::from_csv_bytes(&bytes, options.limit)?;
    let prepared = prepare(frame)?;

    let db_path = options.db_path.clone();
    let table = options.table.clone();
    let truncate = options.truncate;

    let mut report = tokio::task::spawn_blocking(move || {
        let mut conn = db::open(&db_path)?;
        write(&mut conn, prepared, &table, truncate, &progress)
    })
    .await??;

    report.duration = start.elapsed();
    log::info!(
        "Load complete: {} rows read, {} inserted into {}, took {:.1}s",
        report.rows_read,
        report.rows_inserted,
        report.table,
        report.duration.as_secs_f64()
    );

    Ok(report)
}

/// Returns the number of rows currently stored in the table.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the database cannot be opened or the
/// table does not exist.
pub fn count(db_path: &Path, table: &str) -> Result<u64, IngestError> {
    let conn = db::open(db_path)?;
    Ok(stops::count_rows(&conn, table)?)
}
