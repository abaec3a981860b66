//! Document store adapter
//!
//! Validates input, assigns ids, keeps the `doc_id` metadata key in sync and
//! recomputes embeddings, delegating persistence and nearest-neighbour search
//! to a [`VectorBackend`].

use edgelink_core::{
    AppConfig, Document, EdgeLinkError, Metadata, Result, RetrievedDocument, StoreBackend,
    DOC_ID_KEY,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::embedding::{create_embedding_client, EmbeddingClient};
use crate::local_store::LocalStore;
use crate::qdrant_store::QdrantStore;
use crate::{VectorBackend, VectorRecord};

/// Document store: a vector backend paired with the embedder that feeds it
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn VectorBackend>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { backend, embedder }
    }

    /// Build the embedder and backend described by `config`
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = create_embedding_client(&config.embedding)?;

        let backend: Arc<dyn VectorBackend> = match config.store.backend {
            StoreBackend::Local => match &config.store.data_dir {
                Some(dir) => Arc::new(LocalStore::open(dir, config.store.collection.clone()).await?),
                None => Arc::new(LocalStore::in_memory(config.store.collection.clone())),
            },
            StoreBackend::Qdrant => {
                let store = QdrantStore::new(&config.store, embedder.dimension())?;
                store.init_collection().await?;
                Arc::new(store)
            }
        };

        info!(
            backend = backend.name(),
            collection = %config.store.collection,
            dimension = embedder.dimension(),
            "Document store ready"
        );

        Ok(Self::new(backend, embedder))
    }

    /// The embedder used for stored documents (queries must use the same one)
    pub fn embedder(&self) -> Arc<dyn EmbeddingClient> {
        Arc::clone(&self.embedder)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Store a new document and return its generated id
    #[instrument(skip_all, fields(text_length = text.len()))]
    pub async fn add(&self, text: &str, metadata: Option<Metadata>) -> Result<String> {
        if text.trim().is_empty() {
            return Err(EdgeLinkError::InvalidInput(
                "Document text cannot be empty.".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let mut metadata = metadata.unwrap_or_default();
        metadata.insert(DOC_ID_KEY.to_string(), id.clone());

        let vector = self.embedder.embed(text).await?;
        self.backend
            .upsert(VectorRecord {
                id: id.clone(),
                vector,
                text: text.to_string(),
                metadata,
            })
            .await?;

        debug!(id = %id, "Document added");
        Ok(id)
    }

    /// Replace a document's text, merging `metadata` over what is stored
    #[instrument(skip(self, text, metadata))]
    pub async fn update(&self, id: &str, text: &str, metadata: Option<Metadata>) -> Result<()> {
        if text.trim().is_empty() {
            return Err(EdgeLinkError::InvalidInput(
                "Updated document text cannot be empty.".to_string(),
            ));
        }

        if self.backend.get(id).await?.is_none() {
            return Err(not_found(id));
        }

        let mut metadata = metadata.unwrap_or_default();
        metadata.insert(DOC_ID_KEY.to_string(), id.to_string());

        // The record may be deleted while the embedding is computed
        let vector = self.embedder.embed(text).await?;
        let replaced = self
            .backend
            .replace(VectorRecord {
                id: id.to_string(),
                vector,
                text: text.to_string(),
                metadata,
            })
            .await?;
        if !replaced {
            return Err(not_found(id));
        }

        debug!("Document updated");
        Ok(())
    }

    /// Remove a document
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.backend.delete(id).await? {
            debug!("Document deleted");
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.backend.get(id).await
    }

    /// Up to `k` documents nearest to `embedding`, closest first
    pub async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        self.backend.search(embedding, k).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }
}

fn not_found(id: &str) -> EdgeLinkError {
    EdgeLinkError::NotFound(format!("Document with id '{id}' does not exist."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedding;
    use async_trait::async_trait;
    use edgelink_core::EmbeddingProvider;
    use proptest::prelude::*;
    use tokio::sync::Notify;

    fn store() -> DocumentStore {
        DocumentStore::new(
            Arc::new(LocalStore::in_memory("test")),
            Arc::new(HashingEmbedding::new(384)),
        )
    }

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Hashing embedder that parks on `gated_text` until released
    struct GatedEmbedding {
        inner: HashingEmbedding,
        gated_text: String,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl EmbeddingClient for GatedEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text == self.gated_text {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(self.inner.embed_text(text))
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    async fn embed(store: &DocumentStore, text: &str) -> Vec<f32> {
        store.embedder().embed(text).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_doc_id_metadata() {
        let store = store();
        let id = store
            .add("EdgeLink secures the gateway with Actix.", Some(meta(&[("source", "notes.md")])))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.metadata.get(DOC_ID_KEY), Some(&id));
        assert_eq!(doc.metadata.get("source").map(String::as_str), Some("notes.md"));
    }

    #[tokio::test]
    async fn test_add_overrides_caller_doc_id() {
        let store = store();
        let id = store
            .add("some text", Some(meta(&[("doc_id", "spoofed")])))
            .await
            .unwrap();

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.metadata.get(DOC_ID_KEY), Some(&id));
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = store();
        let a = store.add("same text", None).await.unwrap();
        let b = store.add("same text", None).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_empty_text_fails() {
        let store = store();
        for text in ["", "   ", "\n\t"] {
            let err = store.add(text, None).await.unwrap_err();
            assert!(matches!(err, EdgeLinkError::InvalidInput(_)));
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_similarity() {
        let store = store();
        store.add("Rust gateways use tokio for async IO.", None).await.unwrap();
        let id = store
            .add("EdgeLink secures the gateway with Actix.", None)
            .await
            .unwrap();
        store.add("Quarterly revenue figures for a bakery chain.", None).await.unwrap();

        let query = embed(&store, "EdgeLink secures the gateway with Actix.").await;
        let results = store.query(&query, 1).await.unwrap();
        assert_eq!(results[0].id, id);
        assert!(results[0].distance.abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_update_merges_metadata_and_reembeds() {
        let store = store();
        let id = store
            .add(
                "EdgeLink secures the gateway with Actix.",
                Some(meta(&[("source", "v1.md"), ("team", "platform")])),
            )
            .await
            .unwrap();
        store
            .add("The gateway uses TLS termination at the edge.", None)
            .await
            .unwrap();

        store
            .update(
                &id,
                "Quarterly revenue figures for a bakery chain.",
                Some(meta(&[("source", "v2.md"), ("doc_id", "spoofed")])),
            )
            .await
            .unwrap();

        let doc = store.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.text, "Quarterly revenue figures for a bakery chain.");
        assert_eq!(doc.metadata.get("source").map(String::as_str), Some("v2.md"));
        assert_eq!(doc.metadata.get("team").map(String::as_str), Some("platform"));
        assert_eq!(doc.metadata.get(DOC_ID_KEY), Some(&id));

        // The old text no longer pulls the updated document to the top
        let old = embed(&store, "EdgeLink secures the gateway with Actix.").await;
        let results = store.query(&old, 1).await.unwrap();
        assert_ne!(results[0].id, id);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = store();
        store.add("existing", None).await.unwrap();

        let err = store.update("missing", "new text", None).await.unwrap_err();
        assert!(matches!(err, EdgeLinkError::NotFound(_)));
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_racing_delete_does_not_resurrect() {
        let embedder = Arc::new(GatedEmbedding {
            inner: HashingEmbedding::new(384),
            gated_text: "new text".to_string(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let store =
            DocumentStore::new(Arc::new(LocalStore::in_memory("test")), embedder.clone());
        let id = store.add("old text", None).await.unwrap();

        let updating = tokio::spawn({
            let store = store.clone();
            let id = id.clone();
            async move { store.update(&id, "new text", None).await }
        });

        embedder.entered.notified().await;
        store.delete(&id).await.unwrap();
        embedder.release.notify_one();

        let result = updating.await.unwrap();
        assert!(matches!(result, Err(EdgeLinkError::NotFound(_))));
        assert!(store.get(&id).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_empty_text_checked_first() {
        let store = store();
        let err = store.update("missing", " ", None).await.unwrap_err();
        assert!(matches!(err, EdgeLinkError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store();
        let id = store.add("EdgeLink secures the gateway.", None).await.unwrap();

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());

        let query = embed(&store, "EdgeLink secures the gateway.").await;
        assert!(store.query(&query, 10).await.unwrap().is_empty());

        let err = store.delete(&id).await.unwrap_err();
        assert!(matches!(err, EdgeLinkError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_from_config_in_memory() {
        let mut config = AppConfig::default();
        config.store.data_dir = None;
        config.embedding.provider = EmbeddingProvider::Hashing;

        let store = DocumentStore::from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "local");
        assert_eq!(store.embedder().dimension(), 384);
    }

    proptest! {
        #[test]
        fn prop_blank_text_never_mutates(text in "[ \t\n\r]{0,16}") {
            let store = store();
            let existing = tokio_test::block_on(store.add("kept", None)).unwrap();

            let added = tokio_test::block_on(store.add(&text, None));
            prop_assert!(matches!(added, Err(EdgeLinkError::InvalidInput(_))));

            let updated = tokio_test::block_on(store.update(&existing, &text, None));
            prop_assert!(matches!(updated, Err(EdgeLinkError::InvalidInput(_))));

            let doc = tokio_test::block_on(store.get(&existing)).unwrap().unwrap();
            prop_assert_eq!(doc.text, "kept");
            prop_assert_eq!(tokio_test::block_on(store.count()).unwrap(), 1);
        }

        #[test]
        fn prop_unknown_ids_not_found(id in "[a-z0-9-]{0,36}") {
            let store = store();
            tokio_test::block_on(store.add("kept", None)).unwrap();

            let deleted = tokio_test::block_on(store.delete(&id));
            prop_assert!(matches!(deleted, Err(EdgeLinkError::NotFound(_))));
            let updated = tokio_test::block_on(store.update(&id, "text", None));
            prop_assert!(matches!(updated, Err(EdgeLinkError::NotFound(_))));
            prop_assert_eq!(tokio_test::block_on(store.count()).unwrap(), 1);
        }
    }
}
