//! Document management handlers

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use edgelink_core::Metadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Add document request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddDocRequest {
    /// Document content
    #[schema(example = "EdgeLink secures the gateway with Actix.")]
    pub text: String,

    /// Optional string metadata; `source` is used as the citation label
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Add document response
#[derive(Debug, Serialize, ToSchema)]
pub struct AddDocResponse {
    /// Generated document id
    pub document_id: String,

    /// Time spent storing the document
    pub latency_ms: u64,
}

/// Delete document request
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteDocRequest {
    pub document_id: String,
}

/// Update document request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDocRequest {
    pub document_id: String,

    /// Replacement content
    pub text: String,

    /// Metadata merged over the stored metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Result of a delete or update
#[derive(Debug, Serialize, ToSchema)]
pub struct DocStatusResponse {
    pub document_id: String,

    /// `deleted` or `updated`
    #[schema(example = "deleted")]
    pub status: String,
}

/// Add a document
#[utoipa::path(
    post,
    path = "/add_doc",
    tag = "documents",
    request_body = AddDocRequest,
    responses(
        (status = 200, description = "Document stored", body = AddDocResponse),
        (status = 400, description = "Empty text", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 502, description = "Embedding provider failed", body = ApiError)
    )
)]
pub async fn add_doc_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddDocRequest>, JsonRejection>,
) -> Result<Json<AddDocResponse>, AppError> {
    let start = Instant::now();
    let Json(req) = payload?;

    let document_id = state.store.add(&req.text, req.metadata).await?;
    tracing::info!(document_id = %document_id, "Document added");

    Ok(Json(AddDocResponse {
        document_id,
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Delete a document
#[utoipa::path(
    delete,
    path = "/delete_doc",
    tag = "documents",
    request_body = DeleteDocRequest,
    responses(
        (status = 200, description = "Document deleted", body = DocStatusResponse),
        (status = 404, description = "Unknown document id", body = ApiError)
    )
)]
pub async fn delete_doc_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteDocRequest>, JsonRejection>,
) -> Result<Json<DocStatusResponse>, AppError> {
    let Json(req) = payload?;

    state.store.delete(&req.document_id).await?;
    tracing::info!(document_id = %req.document_id, "Document deleted");

    Ok(Json(DocStatusResponse {
        document_id: req.document_id,
        status: "deleted".to_string(),
    }))
}

/// Replace a document's text and merge its metadata
#[utoipa::path(
    put,
    path = "/update_doc",
    tag = "documents",
    request_body = UpdateDocRequest,
    responses(
        (status = 200, description = "Document updated", body = DocStatusResponse),
        (status = 400, description = "Empty text", body = ApiError),
        (status = 404, description = "Unknown document id", body = ApiError),
        (status = 502, description = "Embedding provider failed", body = ApiError)
    )
)]
pub async fn update_doc_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateDocRequest>, JsonRejection>,
) -> Result<Json<DocStatusResponse>, AppError> {
    let Json(req) = payload?;

    state
        .store
        .update(&req.document_id, &req.text, req.metadata)
        .await?;
    tracing::info!(document_id = %req.document_id, "Document updated");

    Ok(Json(DocStatusResponse {
        document_id: req.document_id,
        status: "updated".to_string(),
    }))
}
