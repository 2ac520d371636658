use crate::traits::{IndexHit, VectorIndex};
use crate::{ContentRecord, RecordMetadata, SearchError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    /// Creates the collection with cosine distance when it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), SearchError> {
        let response = self.client.get(self.collection_url()).send().await?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        debug!(
            collection = %self.collection,
            vector_size = self.vector_size,
            "creating collection"
        );

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine"
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

/// Qdrant only accepts integers or UUIDs as point ids, so record ids are hashed.
pub fn point_id(record_id: &str) -> Uuid {
    let digest = Sha256::digest(record_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

fn parse_hits(body: &Value) -> Vec<IndexHit> {
    let hits = body
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut result = Vec::new();
    for hit in hits {
        let metadata = hit
            .pointer("/payload/metadata")
            .cloned()
            .map(serde_json::from_value::<RecordMetadata>);

        let metadata = match metadata {
            Some(Ok(metadata)) => metadata,
            Some(Err(error)) => {
                warn!(error = %error, "skipping qdrant hit with unreadable metadata");
                continue;
            }
            None => {
                warn!("skipping qdrant hit without metadata payload");
                continue;
            }
        };

        let id = match hit.pointer("/payload/record_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let point = hit.pointer("/id").cloned().unwrap_or(Value::Null);
                warn!(point = %point, "skipping qdrant hit without record_id");
                continue;
            }
        };
        let document = hit
            .pointer("/payload/document")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

        result.push(IndexHit {
            id,
            document,
            metadata,
            distance: 1.0 - score,
        });
    }

    result
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert(
        &self,
        records: &[ContentRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match record count {}",
                embeddings.len(),
                records.len()
            )));
        }

        let points = records
            .iter()
            .zip(embeddings.iter())
            .map(|(record, embedding)| {
                if embedding.len() != self.vector_size {
                    return Err(SearchError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": point_id(&record.id).to_string(),
                    "vector": embedding,
                    "payload": {
                        "record_id": record.id,
                        "document": record.content,
                        "metadata": serde_json::to_value(&record.metadata)?,
                    },
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, SearchError> {
        if vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parse_hits(&parsed))
    }

    async fn count(&self) -> Result<usize, SearchError> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url()))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response without result.count".to_string(),
            })
    }
}
