//! Load-pipeline progress reporting.
//!
//! The pipeline reports which [`LoadStage`] it is in and, while inserting,
//! how many rows have been written. Rendering is left to the caller; the
//! CLI draws an `indicatif` bar, tests pass [`NullProgress`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::LoadReport;

/// Steps of one load run, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    /// Downloading or reading the CSV.
    #[strum(serialize = "Fetching")]
    Fetching,
    /// Parsing rows and applying the cleaning pre-pass.
    #[strum(serialize = "Cleaning")]
    Cleaning,
    /// Creating or truncating the destination table.
    #[strum(serialize = "Preparing table")]
    PreparingTable,
    /// Inserting rows.
    #[strum(serialize = "Inserting")]
    Inserting,
}

/// Receives progress events from the load pipeline.
///
/// Every method has an empty default so an implementation only overrides
/// what it renders.
pub trait ProgressCallback: Send + Sync {
    /// The pipeline entered `stage`. `detail` names the source or table.
    fn stage(&self, stage: LoadStage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Number of rows about to be inserted.
    fn rows_total(&self, total: u64) {
        let _ = total;
    }

    /// Rows inserted so far in this run.
    fn rows_inserted(&self, inserted: u64) {
        let _ = inserted;
    }

    /// The transaction committed.
    fn done(&self, report: &LoadReport) {
        let _ = report;
    }
}

/// Ignores every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
