//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, and database file before starting
//! the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::{ServerConfig, ServerError};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Every prompt defaults to the value resolved from the environment, so
/// pressing enter through all of them matches a plain start.
///
/// # Errors
///
/// Returns [`ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run(defaults: ServerConfig) -> Result<(), ServerError> {
    println!("SecureCheck Dashboard Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| defaults.bind_addr.clone());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    let db_path: String = Input::new()
        .with_prompt("Database file")
        .default(defaults.db_path.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| defaults.db_path.display().to_string());

    let config = ServerConfig {
        bind_addr,
        port,
        db_path: PathBuf::from(db_path),
        ..defaults
    };

    if !config.db_path.exists() {
        println!(
            "{} does not exist yet. Run securecheck_ingest load first.",
            config.db_path.display()
        );
        return Ok(());
    }

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
