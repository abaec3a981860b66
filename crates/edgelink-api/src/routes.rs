//! API route definitions

use crate::handlers::{ask, documents, health, home};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Question answering and document management routes
///
/// `/api/ask` and `/api/add_doc` are kept for clients of the earlier gateway.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ask", post(ask::ask_handler))
        .route("/add_doc", post(documents::add_doc_handler))
        .route("/delete_doc", delete(documents::delete_doc_handler))
        .route("/update_doc", put(documents::update_doc_handler))
        .route("/api/ask", post(ask::ask_handler))
        .route("/api/add_doc", post(documents::add_doc_handler))
}

/// Landing page and probes
pub fn probe_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
}
