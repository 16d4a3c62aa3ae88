#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the ingest tool.
//!
//! Provides a `dialoguer` prompt flow for loading the CSV without
//! memorizing CLI flags.

use dialoguer::{Confirm, Input, Select};
use securecheck_cli_utils::{LoadProgressBar, MultiProgress};
use securecheck_database::paths;
use securecheck_ingest_models::LoadOptions;

/// Top-level actions available in the ingest interactive menu.
enum IngestAction {
    Load,
    Count,
}

impl IngestAction {
    const ALL: &[Self] = &[Self::Load, Self::Count];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Load => "Load traffic stops from CSV",
            Self::Count => "Show stored row count",
        }
    }
}

/// Runs the interactive menu, prompting the user to pick and configure
/// an ingest operation.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = IngestAction::ALL.iter().map(IngestAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match IngestAction::ALL[idx] {
        IngestAction::Load => load_interactive(multi).await?,
        IngestAction::Count => {
            let table = paths::table_name();
            let rows = crate::count(&paths::db_path(), &table)?;
            println!("{table}: {rows} rows");
        }
    }

    Ok(())
}

async fn load_interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let source: String = Input::new()
        .with_prompt("CSV URL or path")
        .default(crate::default_source())
        .interact_text()?;

    let table: String = Input::new()
        .with_prompt("Table name")
        .default(paths::table_name())
        .interact_text()?;

    let limit = prompt_optional_u64("Record limit (empty for no limit)")?;

    let truncate = Confirm::new()
        .with_prompt(format!("Delete existing rows from {table} first?"))
        .default(false)
        .interact()?;

    let options = LoadOptions {
        source,
        db_path: paths::db_path(),
        table,
        limit,
        truncate,
    };

    let progress = LoadProgressBar::start(multi);
    let report = crate::load(&options, progress).await?;
    println!(
        "Inserted {} of {} rows into {} in {:.1}s",
        report.rows_inserted,
        report.rows_read,
        report.table,
        report.duration.as_secs_f64()
    );

    Ok(())
}

/// Prompts for an optional `u64`. Empty input returns `None`.
fn prompt_optional_u64(prompt: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.parse()?))
    }
}
