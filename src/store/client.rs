//! Vector store wire contract
//!
//! Narrow interface over the external vector collection: idempotent create,
//! payload-carrying upsert, similarity search, and delete-by-document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vector store failure kinds
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{service} API error {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Payload stored alongside each passage vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub document_id: String,
    pub title: String,
    pub passage_index: usize,
    pub passage_text: String,
}

/// The unit stored in the vector collection
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A raw similarity hit returned by the store
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub payload: PointPayload,
}

/// Trait for vector store backends
///
/// All operations target a named collection with cosine distance. Creating a
/// collection that already exists is a success, so concurrent first-callers
/// can race on `create_collection` safely.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// List existing collection names
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Create a collection with the given dimensionality (idempotent)
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<(), StoreError>;

    /// Insert or replace points by id
    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<(), StoreError>;

    /// Similarity search, up to `limit` hits ordered by descending score
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Delete every point whose payload `document_id` matches (idempotent)
    async fn delete_by_document(&self, collection: &str, document_id: &str)
        -> Result<(), StoreError>;
}
