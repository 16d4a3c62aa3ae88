#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter-and-query engine for the traffic-stop dashboard.
//!
//! [`filter::FilterPredicate`] turns the dashboard's filter selections into
//! one parameterized `WHERE` clause. The fixed panel catalog in
//! [`catalog`] reuses that clause verbatim, and [`exec`] runs the panels
//! and headline metrics against a `DuckDB` connection.

pub mod cache;
pub mod catalog;
pub mod exec;
pub mod export;
pub mod filter;

use securecheck_database::DbError;
use thiserror::Error;

pub use cache::PanelCache;
pub use filter::FilterPredicate;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// CSV export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A date parameter was not `YYYY-MM-DD`.
    #[error("Invalid date {value:?}: {message}. Expected format: YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Parser message.
        message: String,
    },

    /// No panel with this id exists in the catalog.
    #[error("Unknown panel: {id}")]
    UnknownPanel {
        /// The requested id.
        id: String,
    },
}

impl From<duckdb::Error> for AnalyticsError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(DbError::DuckDb(e))
    }
}
