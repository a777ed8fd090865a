//! Request logging middleware.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Log method, path, status and latency of every request.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed();
    if status.is_server_error() {
        log::error!("[http] {} {} -> {} in {:?}", method, path, status.as_u16(), elapsed);
    } else {
        log::info!("[http] {} {} -> {} in {:?}", method, path, status.as_u16(), elapsed);
    }

    response
}
