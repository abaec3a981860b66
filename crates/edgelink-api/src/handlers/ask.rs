//! Question answering handler

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use edgelink_core::Citation;
use edgelink_rag::normalize_top_k;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Ask request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct AskRequest {
    /// User's question
    #[schema(example = "How does EdgeLink secure the gateway?")]
    pub query: String,

    /// Number of documents to retrieve; values below 1 retrieve one
    #[serde(default)]
    #[schema(example = 4, default = 4)]
    pub top_k: Option<i64>,
}

/// Citation information
#[derive(Debug, Serialize, ToSchema)]
pub struct CitationResponse {
    /// `source` metadata of the document, or its id
    #[schema(example = "architecture.md")]
    pub source: String,

    /// Full text of the retrieved document
    pub text: String,
}

impl From<Citation> for CitationResponse {
    fn from(citation: Citation) -> Self {
        Self {
            source: citation.source,
            text: citation.text,
        }
    }
}

/// Ask response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AskResponse {
    /// Generated answer
    pub answer: String,

    /// Retrieved documents, closest first
    pub citations: Vec<CitationResponse>,

    /// Time spent answering
    pub latency_ms: u64,
}

/// Answer a question from the stored documents
///
/// Provider or storage failures during answering yield a 200 with an apology
/// and no citations; a missing generation credential is a 500.
#[utoipa::path(
    post,
    path = "/ask",
    tag = "ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponse),
        (status = 400, description = "Empty query", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 500, description = "Generation service misconfigured", body = ApiError)
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let start = Instant::now();
    let Json(req) = payload?;

    let rag = &state.config.rag;
    let top_k = normalize_top_k(req.top_k, rag.default_top_k, rag.max_top_k);

    let answer = match state.orchestrator.generate_answer(&req.query, top_k).await {
        Ok(answer) => answer,
        Err(e) if e.is_runtime_failure() => {
            tracing::warn!(error = %e, "Answer generation failed; returning fallback answer");
            state.orchestrator.fallback()
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(AskResponse {
        answer: answer.answer,
        citations: answer.citations.into_iter().map(Into::into).collect(),
        latency_ms: start.elapsed().as_millis() as u64,
    }))
}
