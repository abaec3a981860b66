//! Local vector collection
//!
//! Records live in memory behind a `tokio::sync::RwLock` and, when a data
//! directory is configured, the whole collection is rewritten to
//! `<data_dir>/<collection>.json` after every mutation. The file is written
//! to a temporary sibling first and renamed into place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edgelink_core::{Document, EdgeLinkError, Metadata, Result, RetrievedDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{cosine_similarity, VectorBackend, VectorRecord};

/// Record as held in memory and on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    text: String,
    metadata: Metadata,
    vector: Vec<f32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// On-disk collection layout
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    records: Vec<StoredRecord>,
}

/// In-process vector collection with optional on-disk persistence
pub struct LocalStore {
    collection: String,
    path: Option<PathBuf>,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl LocalStore {
    /// Create an empty, memory-only collection
    pub fn in_memory(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            path: None,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Open (or create) a collection persisted under `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
            EdgeLinkError::Storage(format!(
                "Failed to create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        let path = data_dir.join(format!("{collection}.json"));
        let exists = tokio::fs::try_exists(&path).await.map_err(|e| {
            EdgeLinkError::Storage(format!("Failed to stat {}: {e}", path.display()))
        })?;
        let records = if exists {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                EdgeLinkError::Storage(format!("Failed to read {}: {e}", path.display()))
            })?;
            let file: CollectionFile = serde_json::from_str(&content).map_err(|e| {
                EdgeLinkError::Storage(format!("Failed to parse {}: {e}", path.display()))
            })?;
            file.records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect()
        } else {
            HashMap::new()
        };

        info!(
            collection = %collection,
            path = %path.display(),
            count = records.len(),
            "Opened local vector collection"
        );

        Ok(Self {
            collection,
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Location of the collection file, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, records: &HashMap<String, StoredRecord>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut snapshot: Vec<StoredRecord> = records.values().cloned().collect();
        snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let file = CollectionFile {
            collection: self.collection.clone(),
            records: snapshot,
        };

        let json = serde_json::to_vec(&file)
            .map_err(|e| EdgeLinkError::Storage(format!("Failed to serialize collection: {e}")))?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| EdgeLinkError::Storage(format!("Failed to write collection: {e}")))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| EdgeLinkError::Storage(format!("Failed to replace collection: {e}")))?;

        debug!(path = %path.display(), count = records.len(), "Persisted collection");
        Ok(())
    }
}

/// Every other record must share the incoming vector's dimension
fn check_dimension(records: &HashMap<String, StoredRecord>, record: &VectorRecord) -> Result<()> {
    match records.values().find(|r| r.id != record.id) {
        Some(other) if other.vector.len() != record.vector.len() => {
            Err(EdgeLinkError::Storage(format!(
                "Vector dimension mismatch: collection uses {}, got {}",
                other.vector.len(),
                record.vector.len()
            )))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorBackend for LocalStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let mut records = self.records.write().await;
        check_dimension(&records, &record)?;

        let now = Utc::now();
        let created_at = records
            .get(&record.id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let previous = records.insert(
            record.id.clone(),
            StoredRecord {
                id: record.id.clone(),
                text: record.text,
                metadata: record.metadata,
                vector: record.vector,
                created_at,
                updated_at: now,
            },
        );

        if let Err(e) = self.persist(&records).await {
            match previous {
                Some(previous) => records.insert(record.id, previous),
                None => records.remove(&record.id),
            };
            return Err(e);
        }

        Ok(())
    }

    async fn replace(&self, record: VectorRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        check_dimension(&records, &record)?;

        let Some(stored) = records.get_mut(&record.id) else {
            return Ok(false);
        };

        let mut metadata = stored.metadata.clone();
        metadata.extend(record.metadata);
        let replacement = StoredRecord {
            id: record.id,
            text: record.text,
            metadata,
            vector: record.vector,
            created_at: stored.created_at,
            updated_at: Utc::now(),
        };
        let previous = std::mem::replace(stored, replacement);

        if let Err(e) = self.persist(&records).await {
            records.insert(previous.id.clone(), previous);
            return Err(e);
        }

        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|record| Document {
            id: record.id.clone(),
            text: record.text.clone(),
            metadata: record.metadata.clone(),
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(removed) = records.remove(id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&records).await {
            records.insert(removed.id.clone(), removed);
            return Err(e);
        }

        Ok(true)
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>> {
        let records = self.records.read().await;

        let mut results: Vec<RetrievedDocument> = records
            .values()
            .map(|record| RetrievedDocument {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance: 1.0 - cosine_similarity(&record.vector, query_vector),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    fn name(&self) -> &str {
        "local"
    }
}
