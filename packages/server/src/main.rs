#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard API server binary.

use std::path::PathBuf;

use clap::Parser;
use securecheck_server::{ServerConfig, interactive, run_server};

#[derive(Parser)]
#[command(name = "securecheck_server", about = "Traffic-stop dashboard API server")]
struct Cli {
    /// Prompt for settings before starting
    #[arg(short, long)]
    interactive: bool,

    /// Address to bind (overrides `BIND_ADDR`)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides `PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// `DuckDB` file to serve (overrides `SECURECHECK_DB_PATH`)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Table to query (overrides `SECURECHECK_TABLE`)
    #[arg(long)]
    table: Option<String>,

    /// Number of pooled connections (overrides `SECURECHECK_POOL_SIZE`)
    #[arg(long)]
    pool_size: Option<usize>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let defaults = ServerConfig::from_env();

    let config = ServerConfig {
        bind_addr: cli.bind.unwrap_or(defaults.bind_addr),
        port: cli.port.unwrap_or(defaults.port),
        db_path: cli.db.unwrap_or(defaults.db_path),
        table: cli.table.unwrap_or(defaults.table),
        pool_size: cli.pool_size.filter(|n| *n > 0).unwrap_or(defaults.pool_size),
    };

    if cli.interactive {
        interactive::run(config).await?;
    } else {
        run_server(config).await?;
    }

    Ok(())
}
