#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the traffic-stop loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use securecheck_cli_utils::LoadProgressBar;
use securecheck_database::paths;
use securecheck_ingest_models::LoadOptions;

#[derive(Parser)]
#[command(name = "securecheck_ingest", about = "Traffic-stop CSV loader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the traffic-stop CSV into the database
    Load {
        /// CSV URL or local path (defaults to `SECURECHECK_CSV_URL` or the
        /// published dataset)
        #[arg(long)]
        source: Option<String>,
        /// Database file (defaults to `SECURECHECK_DB_PATH` or
        /// `data/securecheck.duckdb`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Destination table (defaults to `SECURECHECK_TABLE` or
        /// `traffic_stops`)
        #[arg(long)]
        table: Option<String>,
        /// Maximum number of CSV rows to load (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Delete existing rows before loading
        #[arg(long)]
        truncate: bool,
        /// Skip the truncate confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Print the number of stored rows
    Count {
        /// Database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Table name
        #[arg(long)]
        table: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = securecheck_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return securecheck_ingest::interactive::run(&multi).await;
    };

    match command {
        Commands::Load {
            source,
            db,
            table,
            limit,
            truncate,
            yes,
        } => {
            let options = LoadOptions {
                source: source.unwrap_or_else(securecheck_ingest::default_source),
                db_path: db.unwrap_or_else(paths::db_path),
                table: table.unwrap_or_else(paths::table_name),
                limit,
                truncate,
            };

            if options.truncate
                && !yes
                && !Confirm::new()
                    .with_prompt(format!(
                        "Delete all existing rows from {} before loading?",
                        options.table
                    ))
                    .default(false)
                    .interact()?
            {
                log::info!("Load cancelled");
                return Ok(());
            }

            let progress = LoadProgressBar::start(&multi);
            let report = securecheck_ingest::load(&options, progress).await?;

            if !report.dropped_columns.is_empty() {
                log::info!("Dropped columns: {}", report.dropped_columns.join(", "));
            }
            println!(
                "Inserted {} of {} rows into {} ({} values coerced to null) in {:.1}s",
                report.rows_inserted,
                report.rows_read,
                report.table,
                report.values_coerced_to_null,
                report.duration.as_secs_f64()
            );
        }
        Commands::Count { db, table } => {
            let table = table.unwrap_or_else(paths::table_name);
            let rows =
                securecheck_ingest::count(&db.unwrap_or_else(paths::db_path), &table)?;
            println!("{table}: {rows} rows");
        }
    }

    Ok(())
}
