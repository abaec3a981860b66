//! API error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use edgelink_core::EdgeLinkError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    #[schema(example = "BAD_REQUEST")]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Misconfigured(String),
    Upstream(String),
    Storage(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Misconfigured(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::NotFound(msg) => ApiError::new("NOT_FOUND", msg),
            AppError::Unauthorized(msg) => ApiError::new("UNAUTHORIZED", msg),
            AppError::Misconfigured(msg) => {
                ApiError::new("SERVICE_MISCONFIGURED", "A provider is not configured")
                    .with_details(msg)
            }
            AppError::Upstream(msg) => {
                ApiError::new("UPSTREAM_UNAVAILABLE", "An upstream provider failed")
                    .with_details(msg)
            }
            AppError::Storage(msg) => {
                ApiError::new("STORAGE_ERROR", "Vector store operation failed").with_details(msg)
            }
            AppError::Internal(msg) => ApiError::internal_error().with_details(msg),
        };

        (status, Json(error)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<EdgeLinkError> for AppError {
    fn from(err: EdgeLinkError) -> Self {
        match err {
            EdgeLinkError::InvalidInput(msg) => AppError::BadRequest(msg),
            EdgeLinkError::NotFound(msg) => AppError::NotFound(msg),
            EdgeLinkError::ServiceMisconfigured(msg) => AppError::Misconfigured(msg),
            EdgeLinkError::Upstream(msg) => AppError::Upstream(msg),
            EdgeLinkError::Storage(msg) => AppError::Storage(msg),
            EdgeLinkError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            EdgeLinkError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
