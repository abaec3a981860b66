//! EdgeLink Vector - Embeddings and vector storage
//!
//! Provides the embedding clients, the vector backends (local on-disk
//! collection and Qdrant), and the [`DocumentStore`] adapter that ties
//! them together behind add/update/delete/query operations.

use async_trait::async_trait;
use edgelink_core::{Document, Metadata, Result, RetrievedDocument};

pub mod embedding;
pub mod local_store;
pub mod qdrant_store;
pub mod store;

pub use embedding::{create_embedding_client, EmbeddingClient, HashingEmbedding};
pub use local_store::LocalStore;
pub use qdrant_store::QdrantStore;
pub use store::DocumentStore;

/// A document together with its embedding, as handed to a backend
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

/// Trait for vector database operations
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert or replace a record
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Replace an existing record's text and vector, merging `record.metadata`
    /// over the stored metadata. Writes nothing and returns `false` when the
    /// id is absent.
    async fn replace(&self, record: VectorRecord) -> Result<bool>;

    /// Fetch a record by id (without its vector)
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Remove a record; returns whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Nearest records to `query_vector`, closest first
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
