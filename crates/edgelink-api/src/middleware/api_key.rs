//! API key gate
//!
//! Active only when `server.api_key` is configured. Probes, the landing page
//! and the OpenAPI document stay reachable without a key.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Paths served without an API key
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/" | "/health" | "/api/health" | "/ready")
        || path.starts_with("/api-docs")
        || path == "/docs"
        || path.starts_with("/docs/")
}

pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.server.api_key.as_deref() else {
        return next.run(request).await;
    };

    let path = request.uri().path().to_string();
    if is_public_path(&path) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.to_str().unwrap_or("").trim());

    let rejection = match provided {
        None => Some(("missing", "Missing X-API-KEY header")),
        Some("") => Some(("empty", "X-API-KEY header must not be empty")),
        Some(key) if key != expected => Some(("mismatch", "Invalid API key")),
        Some(_) => None,
    };
    let Some((reason, message)) = rejection else {
        return next.run(request).await;
    };

    tracing::warn!(
        path = %path,
        method = %request.method(),
        reason,
        "gateway.auth_failed"
    );

    AppError::Unauthorized(message.to_string()).into_response()
}
