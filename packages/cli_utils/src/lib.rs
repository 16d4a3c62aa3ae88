#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the `SecureCheck` command-line tools.
//!
//! [`LoadProgressBar`] renders load-pipeline events with `indicatif`, and
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines print above the bar instead of through it.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use securecheck_ingest_models::LoadReport;
use securecheck_ingest_models::progress::{LoadStage, ProgressCallback};

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {prefix:.bold} {msg}";
const ROWS_TEMPLATE: &str =
    "  {prefix:.bold} {wide_bar:.cyan/dim} {pos}/{len} rows {percent}% [{eta}]";

/// Progress bar for one load run.
///
/// Spins with the current stage name until the row count is known, then
/// switches to a bar over the inserted rows.
pub struct LoadProgressBar {
    bar: ProgressBar,
}

impl LoadProgressBar {
    /// Adds a new spinner to `multi` and returns it as a callback for the
    /// load pipeline.
    #[must_use]
    pub fn start(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(spinner_style());
        bar.set_prefix("Starting");

        Arc::new(Self { bar })
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn rows_style() -> ProgressStyle {
    ProgressStyle::with_template(ROWS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl ProgressCallback for LoadProgressBar {
    fn stage(&self, stage: LoadStage, detail: &str) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(detail.to_string());
    }

    fn rows_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(rows_style());
    }

    fn rows_inserted(&self, inserted: u64) {
        self.bar.set_position(inserted);
    }

    fn done(&self, report: &LoadReport) {
        self.bar.set_style(spinner_style());
        self.bar.set_prefix("Done");
        self.bar.finish_with_message(format!(
            "{} rows in {}",
            report.rows_inserted, report.table
        ));
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
/// Calling it twice keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
