//! Qdrant implementation for vector storage
//!
//! Provides connection management and document operations
//! against a Qdrant collection.

use async_trait::async_trait;
use edgelink_core::{Document, EdgeLinkError, Metadata, Result, RetrievedDocument, StoreConfig};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder,
    Distance, GetPointsBuilder, PointId, PointStruct, PointsIdsList, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{VectorBackend, VectorRecord};

/// Qdrant vector store implementation
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a new Qdrant connection
    pub fn new(config: &StoreConfig, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| EdgeLinkError::Storage(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension,
        })
    }

    /// Create the collection with cosine distance if it does not exist yet
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(map_err)?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(map_err)?;
            info!(
                collection = %self.collection,
                dimension = self.dimension,
                "Created qdrant collection"
            );
        }

        Ok(())
    }
}

fn map_err(e: QdrantError) -> EdgeLinkError {
    EdgeLinkError::Storage(format!("Qdrant error: {e}"))
}

/// Document ids are UUIDs; anything else cannot name a stored point
fn point_id(id: &str) -> Option<PointId> {
    Uuid::parse_str(id)
        .ok()
        .map(|uuid| PointId::from(uuid.to_string()))
}

fn extract_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn extract_id(id: Option<&PointId>) -> String {
    id.and_then(|pid| match &pid.point_id_options {
        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
        None => None,
    })
    .unwrap_or_default()
}

/// Split a point payload into text and metadata
fn from_payload(payload: &HashMap<String, QdrantValue>) -> (String, Metadata) {
    let text = payload
        .get("text")
        .and_then(extract_string)
        .unwrap_or_default();

    let metadata = payload
        .get("metadata")
        .and_then(|v| match &v.kind {
            Some(Kind::StructValue(s)) => Some(
                s.fields
                    .iter()
                    .filter_map(|(k, v)| extract_string(v).map(|s| (k.clone(), s)))
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    (text, metadata)
}

#[async_trait]
impl VectorBackend for QdrantStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let id = point_id(&record.id).ok_or_else(|| {
            EdgeLinkError::InvalidInput(format!("'{}' is not a valid document id", record.id))
        })?;

        let payload = Payload::try_from(serde_json::json!({
            "text": record.text,
            "metadata": record.metadata,
        }))
        .map_err(|e| EdgeLinkError::Storage(format!("Invalid payload: {e}")))?;

        let point = PointStruct::new(id, record.vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection = %self.collection, id = %record.id, "Upserted point");
        Ok(())
    }

    // Qdrant has no conditional write, so a delete landing between the
    // lookup and the upsert is overwritten
    async fn replace(&self, record: VectorRecord) -> Result<bool> {
        let Some(existing) = self.get(&record.id).await? else {
            return Ok(false);
        };

        let mut metadata = existing.metadata;
        metadata.extend(record.metadata);
        self.upsert(VectorRecord { metadata, ..record }).await?;
        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let Some(pid) = point_id(id) else {
            return Ok(None);
        };

        let response = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection, vec![pid]).with_payload(true))
            .await
            .map_err(map_err)?;

        Ok(response.result.into_iter().next().map(|point| {
            let (text, metadata) = from_payload(&point.payload);
            Document {
                id: extract_id(point.id.as_ref()),
                text,
                metadata,
            }
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(pid) = point_id(id) else {
            return Ok(false);
        };
        if self.get(id).await?.is_none() {
            return Ok(false);
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList { ids: vec![pid] })
                    .wait(true),
            )
            .await
            .map_err(map_err)?;

        debug!(collection = %self.collection, id, "Deleted point");
        Ok(true)
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(map_err)?;

        // Qdrant reports cosine similarity; results already come closest first
        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let (text, metadata) = from_payload(&point.payload);
                RetrievedDocument {
                    id: extract_id(point.id.as_ref()),
                    text,
                    metadata,
                    distance: 1.0 - point.score,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(map_err)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
