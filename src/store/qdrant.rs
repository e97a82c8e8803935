//! Qdrant vector store over the REST API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::http::create_client;

use super::client::{IndexedPoint, PointPayload, ScoredPoint, StoreError, VectorStore};

/// Qdrant-backed vector store
pub struct QdrantStore {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchResultPoint>,
}

#[derive(Deserialize)]
struct SearchResultPoint {
    id: serde_json::Value,
    score: f32,
    payload: Option<PointPayload>,
}

impl QdrantStore {
    pub fn new(base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        info!("Qdrant vector store @ {}", base_url);
        Self {
            client: create_client(),
            base_url,
        }
    }

    async fn into_store_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Api {
            service: "Qdrant".to_string(),
            status,
            message,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        let body: CollectionsResponse = response.json().await?;
        Ok(body.result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<(), StoreError> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.base_url, name))
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" }
            }))
            .send()
            .await?;

        // A concurrent creator winning first is fine.
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        info!("Created collection '{}' ({} dims, cosine)", name, dimensions);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<(), StoreError> {
        let points: Vec<serde_json::Value> = points
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": p.payload,
                })
            })
            .collect();

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.base_url, collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.base_url, collection
            ))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }

        let body: SearchResponse = response.json().await?;
        let hits = body
            .result
            .into_iter()
            .filter_map(|p| {
                let payload = p.payload?;
                let id = match p.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some(ScoredPoint {
                    id,
                    score: p.score,
                    payload,
                })
            })
            .collect();

        Ok(hits)
    }

    async fn delete_by_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.base_url, collection
            ))
            .json(&json!({
                "filter": {
                    "must": [
                        { "key": "document_id", "match": { "value": document_id } }
                    ]
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_store_error(response).await);
        }
        Ok(())
    }
}
