//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = String)
    )
)]
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness response
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    /// Stored documents; absent when the store cannot be reached
    pub document_count: Option<usize>,
    pub llm_credential_present: bool,
    pub uptime_seconds: u64,
}

/// Readiness probe - checks the vector store and generation credential
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Vector store unavailable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let document_count = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check could not reach the vector store");
            None
        }
    };

    let response = ReadinessResponse {
        ready: document_count.is_some(),
        document_count,
        llm_credential_present: state.orchestrator.llm_client().is_configured(),
        uptime_seconds: state.uptime_secs(),
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
