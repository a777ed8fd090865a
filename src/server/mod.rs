//! HTTP server exposing the reviewer services as a JSON API.

pub mod api;
pub mod dto;
pub mod error;
pub mod middleware;

use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::db::DbError;
use crate::services::Services;

/// Shared state for the axum routes.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Deadline applied to every service call.
    pub request_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database initialization failed: {0}")]
    Database(#[from] DbError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the full router with request logging.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api::team_routes())
        .merge(api::user_routes())
        .merge(api::pull_request_routes())
        .merge(api::analytics_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::log_requests))
}

/// Serve `state` on `listener` until `cancel` fires, then drain in-flight
/// requests and return.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    log::info!("[server] Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    log::info!("[server] Stopped");
    Ok(())
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
pub async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[server] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("[server] Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => return,
    }

    log::info!("[server] Shutdown signal received");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let state = AppState {
            services: Services::in_memory(Arc::new(InMemoryBackend::with_seed(1))),
            request_timeout: Duration::from_millis(300),
        };
        let cancel = CancellationToken::new();

        let server = tokio::spawn(serve(listener, state, cancel.clone()));
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
