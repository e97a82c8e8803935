//! In-memory vector store
//!
//! Brute-force cosine search over a hash map. Used for tests and for
//! `store.provider = "memory"` runs where no external store is available.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use super::client::{IndexedPoint, ScoredPoint, StoreError, VectorStore};

#[derive(Default)]
struct Collection {
    dimensions: usize,
    points: FxHashMap<String, IndexedPoint>,
}

/// In-memory vector store with brute-force cosine search
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<FxHashMap<String, Collection>>,
    upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upsert batches received (batching introspection)
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let collections = self.collections.read().expect("lock poisoned");
        Ok(collections.keys().cloned().collect())
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<(), StoreError> {
        let mut collections = self.collections.write().expect("lock poisoned");
        // Concurrent creators race benignly: first one wins, rest are no-ops.
        collections.entry(name.to_string()).or_insert(Collection {
            dimensions,
            points: FxHashMap::default(),
        });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexedPoint>) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let mut collections = self.collections.write().expect("lock poisoned");
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::Other(format!("collection {} not found", collection)))?;

        for point in points {
            if point.vector.len() != coll.dimensions {
                return Err(StoreError::DimensionMismatch {
                    expected: coll.dimensions,
                    actual: point.vector.len(),
                });
            }
            coll.points.insert(point.id.clone(), point);
        }

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let collections = self.collections.read().expect("lock poisoned");
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::Other(format!("collection {} not found", collection)))?;

        let mut hits: Vec<ScoredPoint> = coll
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        // Stable sort on score only; ties keep map iteration order within
        // one process, which is all the contract asks.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn delete_by_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().expect("lock poisoned");
        if let Some(coll) = collections.get_mut(collection) {
            coll.points
                .retain(|_, point| point.payload.document_id != document_id);
        }
        Ok(())
    }
}
