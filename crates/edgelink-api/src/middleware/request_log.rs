//! Per-request logging
//!
//! Emits a `gateway.request` event with method, path, status and latency
//! for every request.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(%method, path, status, latency_ms, "gateway.request");
    } else {
        tracing::info!(%method, path, status, latency_ms, "gateway.request");
    }

    response
}
