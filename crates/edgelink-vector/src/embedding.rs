//! Embedding clients for generating vector representations
//!
//! Supports a deterministic offline hashing embedder, the OpenAI and Ollama
//! embedding APIs, and (behind `local-embeddings`) in-process ONNX models.

use async_trait::async_trait;
use edgelink_core::{Credential, EdgeLinkError, EmbeddingConfig, EmbeddingProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

// ============================================================================
// Hashing Embedding
// ============================================================================

/// Offline feature-hashing embedder
///
/// Lower-cased alphanumeric tokens are hashed into a fixed number of signed
/// buckets and the result is L2-normalised. Texts sharing words end up
/// close in cosine distance; identical texts map to identical vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    dimension: usize,
}

impl HashingEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous variant used by [`EmbeddingClient::embed`]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    credential: Credential,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(credential: Credential, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536, // text-embedding-3-small, ada-002
        };

        Self {
            client: Client::new(),
            credential,
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let mut client = Self::new(config.credential(), config.model.clone());
        if let Some(url) = &config.openai_base_url {
            client.base_url = url.trim_end_matches('/').to_string();
        }
        client
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EdgeLinkError::Upstream("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.credential.require()?;
        let request = OpenAiEmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EdgeLinkError::Upstream(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EdgeLinkError::Upstream(format!(
                "OpenAI embedding error ({status}): {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            EdgeLinkError::Upstream(format!("Failed to parse embedding response: {e}"))
        })?;

        let mut embeddings = result.data;
        embeddings.sort_by_key(|e| e.index);

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768,
        };

        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model.clone())
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                EdgeLinkError::Upstream(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EdgeLinkError::Upstream(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            EdgeLinkError::Upstream(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Local ONNX Embedding (fastembed)
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedding;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    /// In-process sentence embedding model
    pub struct LocalEmbedding {
        model: Arc<TextEmbedding>,
        dimension: usize,
    }

    impl LocalEmbedding {
        /// Load (downloading on first use) the named model
        pub fn new(model_name: &str) -> Result<Self> {
            let (model, dimension) = match model_name {
                "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
                    (EmbeddingModel::BGESmallENV15, 384)
                }
                "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
                _ => (EmbeddingModel::AllMiniLML6V2, 384),
            };

            let model = TextEmbedding::try_new(InitOptions::new(model)).map_err(|e| {
                EdgeLinkError::Config(format!("Failed to load embedding model {model_name}: {e}"))
            })?;

            Ok(Self {
                model: Arc::new(model),
                dimension,
            })
        }
    }

    #[async_trait]
    impl EmbeddingClient for LocalEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_batch(&[text.to_string()])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| EdgeLinkError::Upstream("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || model.embed(texts, None))
                .await
                .map_err(|e| EdgeLinkError::Upstream(format!("Embedding task failed: {e}")))?
                .map_err(|e| EdgeLinkError::Upstream(format!("Local embedding failed: {e}")))
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingClient>> {
    match config.provider {
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedding::new(config.dimension))),
        EmbeddingProvider::OpenAI => Ok(Arc::new(OpenAiEmbedding::from_config(config))),
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedding::from_config(config))),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Ok(Arc::new(LocalEmbedding::new(&config.model)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => Err(EdgeLinkError::Config(
            "local embeddings require the `local-embeddings` feature".to_string(),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;
    use proptest::prelude::*;

    #[test]
    fn test_openai_dimension() {
        let client = OpenAiEmbedding::new(Credential::None, "text-embedding-3-small");
        assert_eq!(client.dimension(), 1536);

        let client = OpenAiEmbedding::new(Credential::None, "text-embedding-3-large");
        assert_eq!(client.dimension(), 3072);
    }

    #[test]
    fn test_ollama_dimension() {
        let client = OllamaEmbedding::new("http://localhost:11434", "nomic-embed-text");
        assert_eq!(client.dimension(), 768);

        let client = OllamaEmbedding::new("http://localhost:11434/", "all-minilm");
        assert_eq!(client.dimension(), 384);
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_openai_missing_key_is_misconfigured() {
        let client = OpenAiEmbedding::new(
            Credential::env("EDGELINK_TEST_OPENAI_KEY_NEVER_SET"),
            "text-embedding-3-small",
        );
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, EdgeLinkError::ServiceMisconfigured(_)));
    }

    #[test]
    fn test_hashing_shared_words_are_closer() {
        let embedder = HashingEmbedding::new(384);
        let doc = embedder.embed_text("EdgeLink secures the gateway with Actix.");
        let related = embedder.embed_text("How does EdgeLink secure the gateway?");
        let unrelated = embedder.embed_text("Quarterly revenue figures for a bakery chain");

        assert!(cosine_similarity(&doc, &related) > cosine_similarity(&doc, &unrelated));
    }

    #[test]
    fn test_hashing_ignores_case_and_punctuation() {
        let embedder = HashingEmbedding::new(64);
        assert_eq!(
            embedder.embed_text("Gateway, EdgeLink!"),
            embedder.embed_text("gateway edgelink")
        );
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let embedder = HashingEmbedding::new(16);
        assert!(embedder.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_openai_embedding_request() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let mut client = OpenAiEmbedding::new(
            Credential::Static("test-key".to_string()),
            "text-embedding-3-small",
        );
        client.base_url = server.uri();

        let vectors = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_ollama_embedding_error_is_upstream() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaEmbedding::new(server.uri(), "nomic-embed-text");
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, EdgeLinkError::Upstream(_)));
    }

    #[test]
    fn test_factory_builds_hashing() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hashing,
            dimension: 128,
            ..EmbeddingConfig::default()
        };
        let client = create_embedding_client(&config).unwrap();
        assert_eq!(client.dimension(), 128);
    }

    #[cfg(not(feature = "local-embeddings"))]
    #[test]
    fn test_default_model_needs_local_embeddings() {
        let err = create_embedding_client(&EmbeddingConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, EdgeLinkError::Config(_)));
    }

    proptest! {
        #[test]
        fn prop_hashing_is_unit_length_or_zero(text in ".{0,200}", dim in 1usize..512) {
            let vector = HashingEmbedding::new(dim).embed_text(&text);
            prop_assert_eq!(vector.len(), dim);
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_hashing_is_deterministic(text in "[a-zA-Z]{1,12}( [a-zA-Z]{1,12}){0,10}") {
            let a = HashingEmbedding::new(384).embed_text(&text);
            let b = HashingEmbedding::new(384).embed_text(&text);
            prop_assert_eq!(a, b);
        }
    }
}
