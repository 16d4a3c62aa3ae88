#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the `SecureCheck` traffic-stop dashboard.
//!
//! Serves the filter options, headline metrics, and the fixed panel catalog
//! as JSON, plus per-panel CSV downloads. Every query runs against a
//! read-only `DuckDB` file written by the ingest tool.

mod handlers;
pub mod interactive;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use securecheck_database::{DbError, db, paths, schema};
use thiserror::Error;

/// Environment variable for the number of pooled connections.
pub const POOL_SIZE_ENV: &str = "SECURECHECK_POOL_SIZE";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_SIZE: usize = 4;

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or running the HTTP server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database could not be opened.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The database has no table by the configured name.
    #[error("Table {table} not found; run the ingest tool first")]
    MissingTable {
        /// Configured table name.
        table: String,
    },
}

/// Simple round-robin pool of read-only `DuckDB` connections.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so each connection is
/// wrapped in a `Mutex`. The pool hands out connections round-robin via
/// an atomic counter, allowing concurrent queries on different
/// connections.
pub struct DuckDbPool {
    connections: Vec<Mutex<duckdb::Connection>>,
    next: AtomicUsize,
}

impl DuckDbPool {
    /// Opens `size` read-only connections to the `DuckDB` file at `path`.
    /// A size of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any connection fails to open.
    pub fn new(path: &Path, size: usize) -> Result<Self, DbError> {
        let connections = (0..size.max(1))
            .map(|_| db::open_read_only(path).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Builds a pool of `size` handles onto an already-open database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a handle cannot be cloned.
    pub fn from_connection(conn: duckdb::Connection, size: usize) -> Result<Self, DbError> {
        let mut connections = Vec::with_capacity(size.max(1));
        for _ in 1..size.max(1) {
            connections.push(Mutex::new(conn.try_clone()?));
        }
        connections.push(Mutex::new(conn));

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Number of connections in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.connections.len()
    }

    /// Acquires the next connection from the pool (round-robin).
    ///
    /// A connection whose previous holder panicked is still handed out;
    /// every query starts from a clean statement.
    pub fn acquire(&self) -> MutexGuard<'_, duckdb::Connection> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fails unless `table` exists in the pooled database.
///
/// # Errors
///
/// Returns [`ServerError::MissingTable`] if it does not, or
/// [`ServerError::Database`] if the catalog cannot be read.
pub fn check_table(pool: &DuckDbPool, table: &str) -> Result<(), ServerError> {
    if schema::table_exists(&pool.acquire(), table)? {
        Ok(())
    } else {
        Err(ServerError::MissingTable {
            table: table.to_string(),
        })
    }
}

/// Shared application state.
pub struct AppState {
    /// Read-only connections to the traffic-stop database.
    pub pool: Arc<DuckDbPool>,
    /// Name of the table the ingest tool loaded.
    pub table: String,
}

/// Server settings, resolved from the environment and overridable from the
/// command line or the interactive prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// `DuckDB` file to serve.
    pub db_path: PathBuf,
    /// Table to query.
    pub table: String,
    /// Number of pooled connections.
    pub pool_size: usize,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `SECURECHECK_DB_PATH`,
    /// `SECURECHECK_TABLE`, and `SECURECHECK_POOL_SIZE`, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let pool_size = std::env::var(POOL_SIZE_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_POOL_SIZE);

        Self {
            bind_addr,
            port,
            db_path: paths::db_path(),
            table: paths::table_name(),
            pool_size,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Registers the `/api` routes.
///
/// `/panels/all` is registered ahead of `/panels/{id}` so it is never
/// taken for a panel id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/filters", web::get().to(handlers::filters))
            .route("/metrics", web::get().to(handlers::metrics))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/panels", web::get().to(handlers::panel_catalog))
            .route("/panels/all", web::get().to(handlers::all_panels))
            .route("/panels/{id}", web::get().to(handlers::panel))
            .route("/panels/{id}/csv", web::get().to(handlers::panel_csv)),
    );
}

/// Starts the dashboard API server.
///
/// Opens the connection pool and starts the Actix-Web HTTP server. This is
/// a regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError::Database`] if the database cannot be opened,
/// [`ServerError::MissingTable`] if it holds no stop table, or
/// [`ServerError::Io`] if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    schema::validate_table_name(&config.table)?;

    log::info!(
        "Opening {} read-only connections to {}",
        config.pool_size,
        config.db_path.display()
    );
    let pool = DuckDbPool::new(&config.db_path, config.pool_size)?;
    check_table(&pool, &config.table)?;

    let state = web::Data::new(AppState {
        pool: Arc::new(pool),
        table: config.table.clone(),
    });

    log::info!(
        "Starting server on {}:{} (table {})",
        config.bind_addr,
        config.port,
        config.table
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
