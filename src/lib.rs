//! PR Reviewer - reviewer assignment service for team pull requests.
//!
//! Assigns reviewers when a pull request is opened, swaps reviewers on
//! request, and repairs open reviews when team members are deactivated in
//! bulk. State lives in SQLite; the service speaks JSON over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod services;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use config::AppConfig;
use server::{AppState, ServerError};
use services::Services;

/// Start the service and block until Ctrl-C or SIGTERM.
pub async fn run(config: AppConfig) -> Result<(), ServerError> {
    let cancel = CancellationToken::new();
    tokio::spawn(server::shutdown_on_signal(cancel.clone()));
    run_until(config, cancel).await
}

/// Start the service and block until `cancel` fires.
pub async fn run_until(config: AppConfig, cancel: CancellationToken) -> Result<(), ServerError> {
    let pool =
        db::initialize_with(&config.database.path, &config.database.pool_settings()).await?;
    log::info!("[db] Database ready at {}", config.database.path.display());

    let state = AppState {
        services: Services::sqlite(pool.clone()),
        request_timeout: config.server.request_timeout(),
    };

    let listener = TcpListener::bind(config.server.bind_addr()).await?;
    let result = server::serve(listener, state, cancel).await;

    pool.close().await;
    result
}
