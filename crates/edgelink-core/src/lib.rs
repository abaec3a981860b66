//! EdgeLink Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout EdgeLink:
//! - Documents, retrieved documents and citations
//! - Common error types
//! - The generation client trait
//! - Credential resolution for hosted providers
//! - Configuration management

pub mod config;
pub mod credential;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LlmConfig, LlmProvider,
    LoggingConfig, RagConfig, ServerConfig, StoreBackend, StoreConfig,
};
pub use credential::Credential;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for EdgeLink operations
#[derive(Error, Debug)]
pub enum EdgeLinkError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Service misconfigured: {0}")]
    ServiceMisconfigured(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EdgeLinkError {
    /// Whether the failure came from an external collaborator at runtime
    /// (provider outage, storage hiccup) rather than from the caller or
    /// from deployment configuration.
    pub fn is_runtime_failure(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Storage(_) | Self::Other(_))
    }
}

impl From<ConfigError> for EdgeLinkError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EdgeLinkError>;

// ============================================================================
// Documents
// ============================================================================

/// String-to-string metadata attached to a document
pub type Metadata = BTreeMap<String, String>;

/// Metadata key under which every document stores its own id
pub const DOC_ID_KEY: &str = "doc_id";

/// Metadata key used as the citation label when present
pub const SOURCE_KEY: &str = "source";

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, assigned at creation
    pub id: String,

    /// Document content
    pub text: String,

    /// Arbitrary metadata (always contains [`DOC_ID_KEY`])
    pub metadata: Metadata,
}

/// A document returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,

    /// Cosine distance to the query embedding (lower is closer)
    pub distance: f32,
}

impl RetrievedDocument {
    /// Citation label: the `source` metadata value, falling back to the id
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn to_citation(&self) -> Citation {
        Citation {
            source: self.source().to_string(),
            text: self.text.clone(),
        }
    }
}

// ============================================================================
// Answers
// ============================================================================

/// A retrieved document's source label and text, shown alongside an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub text: String,
}

/// Generated answer with the citations it was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for generation (LLM) clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single prompt and return the generated text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn provider(&self) -> &str;

    /// Whether the credential this client needs is currently available
    fn is_configured(&self) -> bool {
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
