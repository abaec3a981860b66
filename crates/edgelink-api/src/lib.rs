//! EdgeLink API - HTTP server
//!
//! Exposes question answering over the stored documents and the document
//! management operations, plus probes, a landing page and an OpenAPI document.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use handlers::{ask, documents, health};

/// OpenAPI document for the public routes
#[derive(OpenApi)]
#[openapi(
    info(
        title = "EdgeLink API",
        description = "Retrieval-augmented question answering over a managed document collection"
    ),
    paths(
        ask::ask_handler,
        documents::add_doc_handler,
        documents::delete_doc_handler,
        documents::update_doc_handler,
        health::health_check,
        health::readiness_check,
    ),
    components(schemas(
        ask::AskRequest,
        ask::AskResponse,
        ask::CitationResponse,
        documents::AddDocRequest,
        documents::AddDocResponse,
        documents::DeleteDocRequest,
        documents::UpdateDocRequest,
        documents::DocStatusResponse,
        health::ReadinessResponse,
        error::ApiError,
    )),
    tags(
        (name = "ask", description = "Question answering"),
        (name = "documents", description = "Document management"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// Build the application router around shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .merge(routes::api_routes())
        .merge(routes::probe_routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route("/api-docs/openapi.json", axum::routing::get(openapi_json));

    let router = router
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::api_key_middleware,
        ))
        .layer(from_fn(middleware::request_log_middleware))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size));

    let router = match cors_layer(&state.config.server.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(ApiDoc::openapi())
}

/// CORS for the configured origins; `*` allows any origin, none disables CORS
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(origins))
}
