//! Vector index - ingestion and retrieval over the vector collection

mod client;
mod docs;
mod memory;
mod qdrant;

pub use client::{IndexedPoint, PointPayload, ScoredPoint, StoreError, VectorStore};
pub use docs::{DocumentRecord, DocumentStore, JsonlDocumentStore, MemoryDocumentStore};
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::segment::Segmenter;

/// Points per upsert request, bounding request size
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Raw hits fetched per requested document, so grouping still yields enough
/// distinct documents
pub const OVERFETCH_FACTOR: usize = 5;

/// Passage texts kept per document-level result
pub const RELEVANT_PASSAGES_PER_DOCUMENT: usize = 3;

/// A document handed to ingestion
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// A segmented unit of document text, as indexed
///
/// `index` values are contiguous from 0 within a document and define
/// reconstruction order.
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: String,
    pub document_id: String,
    pub index: usize,
    pub text: String,
}

/// A passage-level search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub passage_text: String,
    pub passage_index: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// A document-level search result aggregated from passage hits
#[derive(Debug, Clone)]
pub struct DocumentSearchResult {
    pub document_id: String,
    pub title: String,
    /// Full stored document text, or the joined relevant passages if the
    /// document store no longer has it
    pub content: String,
    pub best_score: f32,
    /// Up to three passage texts by descending score
    pub relevant_passages: Vec<String>,
}

/// Vector index over one passage collection
///
/// Owns no mutable state beyond a memoized "collection exists" marker; all
/// operations may run concurrently.
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    documents: Arc<dyn DocumentStore>,
    embedder: Arc<EmbeddingProvider>,
    segmenter: Arc<Segmenter>,
    collection: String,
    ensured: OnceCell<()>,
}

impl VectorIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
        embedder: Arc<EmbeddingProvider>,
        segmenter: Arc<Segmenter>,
        collection: String,
    ) -> Self {
        Self {
            store,
            documents,
            embedder,
            segmenter,
            collection,
            ensured: OnceCell::new(),
        }
    }

    /// Create the collection if it does not exist yet
    ///
    /// Called lazily before every operation; memoized per process. The store
    /// treats a lost create race as success, so concurrent first-callers are
    /// safe.
    async fn ensure_collection(&self) -> anyhow::Result<()> {
        self.ensured
            .get_or_try_init(|| async {
                let existing = self.store.list_collections().await?;
                if !existing.iter().any(|name| name == &self.collection) {
                    self.store
                        .create_collection(&self.collection, self.embedder.dimensions())
                        .await?;
                    info!(
                        "Created vector collection '{}' ({} dims)",
                        self.collection,
                        self.embedder.dimensions()
                    );
                }
                Ok::<_, anyhow::Error>(())
            })
            .await?;
        Ok(())
    }

    /// Segment, embed, and index one document
    ///
    /// Passages are embedded and upserted in index order, in batches of
    /// [`UPSERT_BATCH_SIZE`]. Cancellation is honored between batches; a
    /// cancelled call returns the passages already indexed (the document is
    /// then partially indexed, by design there is no cross-batch rollback).
    pub async fn add_document(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<Passage>> {
        self.ensure_collection().await?;

        let texts = self.segmenter.segment(&document.text);
        let passages: Vec<Passage> = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Passage {
                id: Uuid::new_v4().to_string(),
                document_id: document.id.clone(),
                index,
                text,
            })
            .collect();

        info!(
            "Indexing document '{}': {} passages",
            document.title,
            passages.len()
        );

        let mut indexed = Vec::with_capacity(passages.len());
        for batch in passages.chunks(UPSERT_BATCH_SIZE) {
            if cancel.is_cancelled() {
                warn!(
                    "Ingestion cancelled: document '{}' indexed {}/{} passages",
                    document.id,
                    indexed.len(),
                    passages.len()
                );
                return Ok(indexed);
            }

            let texts: Vec<&str> = batch.iter().map(|p| p.text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            let points: Vec<IndexedPoint> = batch
                .iter()
                .zip(vectors)
                .map(|(passage, vector)| IndexedPoint {
                    id: passage.id.clone(),
                    vector,
                    payload: PointPayload {
                        document_id: passage.document_id.clone(),
                        title: document.title.clone(),
                        passage_index: passage.index,
                        passage_text: passage.text.clone(),
                    },
                })
                .collect();

            self.store.upsert(&self.collection, points).await?;
            indexed.extend(batch.iter().cloned());
        }

        Ok(indexed)
    }

    /// Passage-level similarity search
    pub async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        self.ensure_collection().await?;

        let vector = self.embedder.embed_text(query).await?;
        if vector.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.store.search(&self.collection, &vector, limit).await?;
        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                document_id: hit.payload.document_id,
                title: hit.payload.title,
                passage_text: hit.payload.passage_text,
                passage_index: hit.payload.passage_index,
                score: hit.score,
            })
            .collect())
    }

    /// Document-level search: group passage hits by document
    ///
    /// Over-fetches raw hits by [`OVERFETCH_FACTOR`], keeps the best score
    /// per document and its top passages, orders by descending best score,
    /// and hydrates each selected document's full text from the document
    /// store.
    pub async fn search_documents(
        &self,
        query: &str,
        document_limit: usize,
    ) -> anyhow::Result<Vec<DocumentSearchResult>> {
        let hits = self
            .search(query, OVERFETCH_FACTOR * document_limit)
            .await?;

        // Group by document, preserving descending-score hit order
        let mut groups: Vec<(String, String, f32, Vec<String>)> = Vec::new();
        let mut by_document = rustc_hash::FxHashMap::default();

        for hit in hits {
            let idx = *by_document.entry(hit.document_id.clone()).or_insert_with(|| {
                groups.push((hit.document_id.clone(), hit.title.clone(), hit.score, Vec::new()));
                groups.len() - 1
            });
            let group = &mut groups[idx];
            group.2 = group.2.max(hit.score);
            group.3.push(hit.passage_text);
        }

        // Hits were already sorted, but group insertion order follows the
        // first (best) hit; sort stably on best score to be explicit.
        groups.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        groups.truncate(document_limit);

        let mut results = Vec::with_capacity(groups.len());
        for (document_id, title, best_score, mut passages) in groups {
            passages.truncate(RELEVANT_PASSAGES_PER_DOCUMENT);

            let content = match self.documents.full_text(&document_id).await? {
                Some(text) => text,
                None => {
                    warn!(
                        "Document '{}' missing from document store, using passages",
                        document_id
                    );
                    passages.join("\n\n")
                }
            };

            results.push(DocumentSearchResult {
                document_id,
                title,
                content,
                best_score,
                relevant_passages: passages,
            });
        }

        Ok(results)
    }

    /// Remove every indexed point of one document (idempotent)
    pub async fn delete_document(&self, document_id: &str) -> anyhow::Result<()> {
        self.ensure_collection().await?;
        self.store
            .delete_by_document(&self.collection, document_id)
            .await?;
        info!("Deleted document '{}' from vector index", document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingMode;
    use crate::segment::{NoBoundaryModel, WhitespaceTokenizer};

    struct Fixture {
        store: Arc<MemoryStore>,
        documents: Arc<MemoryDocumentStore>,
        index: VectorIndex,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let embedder = Arc::new(
            EmbeddingProvider::new("simulated".to_string(), 128, EmbeddingMode::Simulated)
                .unwrap(),
        );
        let segmenter = Arc::new(
            Segmenter::new(Arc::new(WhitespaceTokenizer), Arc::new(NoBoundaryModel), 512)
                .with_min_chunk_size(1),
        );
        let index = VectorIndex::new(
            store.clone(),
            documents.clone(),
            embedder,
            segmenter,
            "test".to_string(),
        );
        Fixture {
            store,
            documents,
            index,
        }
    }

    fn document(id: &str, title: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    fn store_doc(fixture: &Fixture, doc: &Document) {
        fixture.documents.add(DocumentRecord {
            id: doc.id.clone(),
            title: doc.title.clone(),
            text: doc.text.clone(),
        });
    }

    #[tokio::test]
    async fn test_add_document_returns_ordered_passages() {
        let f = fixture();
        let doc = document(
            "d1",
            "Doc One",
            "first paragraph about engines\n\nsecond paragraph about search\n\nthird paragraph about storage",
        );
        let passages = f
            .index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(passages.len(), 3);
        for (i, p) in passages.iter().enumerate() {
            assert_eq!(p.index, i);
            assert_eq!(p.document_id, "d1");
        }
    }

    #[tokio::test]
    async fn test_round_trip_exact_passage_is_top_hit() {
        let f = fixture();
        let doc = document(
            "d1",
            "Doc One",
            "vector similarity search with cosine scoring\n\nunrelated paragraph about gardening",
        );
        f.index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();
        let other = document("d2", "Doc Two", "completely different topic entirely here");
        f.index
            .add_document(&other, &CancellationToken::new())
            .await
            .unwrap();

        let hits = f
            .index
            .search("vector similarity search with cosine scoring", 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d1");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_upserts_are_batched() {
        let f = fixture();
        let text = (0..250)
            .map(|i| format!("paragraph number {} with some words", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let doc = document("d1", "Big", &text);
        let passages = f
            .index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(passages.len(), 250);
        // 250 passages at 100 per batch -> 3 upserts
        assert_eq!(f.store.upsert_calls(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_ingestion_stops_before_first_batch() {
        let f = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let doc = document("d1", "Doc", "some text here");
        let passages = f.index.add_document(&doc, &cancel).await.unwrap();
        assert!(passages.is_empty());
        assert_eq!(f.store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_query_returns_no_hits() {
        let f = fixture();
        let doc = document("d1", "Doc", "some text here");
        f.index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();
        assert!(f.index.search("   ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_documents_limits_and_orders() {
        let f = fixture();
        for i in 0..5 {
            let doc = document(
                &format!("d{}", i),
                &format!("Doc {}", i),
                &format!("topic {} with shared words about retrieval systems", i),
            );
            store_doc(&f, &doc);
            f.index
                .add_document(&doc, &CancellationToken::new())
                .await
                .unwrap();
        }

        let results = f
            .index
            .search_documents("shared words about retrieval systems", 3)
            .await
            .unwrap();

        assert!(results.len() <= 3);
        for pair in results.windows(2) {
            assert!(pair[0].best_score >= pair[1].best_score);
        }
        for result in &results {
            assert!(result.relevant_passages.len() <= RELEVANT_PASSAGES_PER_DOCUMENT);
            assert!(!result.content.is_empty());
        }
    }

    #[tokio::test]
    async fn test_search_documents_hydrates_full_text() {
        let f = fixture();
        let doc = document(
            "d1",
            "Doc One",
            "indexed paragraph about retrieval\n\nanother paragraph never matching",
        );
        store_doc(&f, &doc);
        f.index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();

        let results = f
            .index
            .search_documents("indexed paragraph about retrieval", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        // Content is the full stored text, not just the matching passage.
        assert_eq!(results[0].content, doc.text);
    }

    #[tokio::test]
    async fn test_search_documents_falls_back_to_passages() {
        let f = fixture();
        // Indexed but never stored in the document store.
        let doc = document("ghost", "Ghost", "spectral paragraph about retrieval");
        f.index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();

        let results = f
            .index
            .search_documents("spectral paragraph about retrieval", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "spectral paragraph about retrieval");
    }

    #[tokio::test]
    async fn test_delete_document_removes_all_points() {
        let f = fixture();
        let doc = document(
            "d1",
            "Doc One",
            "first searchable paragraph\n\nsecond searchable paragraph",
        );
        f.index
            .add_document(&doc, &CancellationToken::new())
            .await
            .unwrap();

        f.index.delete_document("d1").await.unwrap();
        f.index.delete_document("d1").await.unwrap(); // idempotent

        let hits = f.index.search("searchable paragraph", 10).await.unwrap();
        assert!(hits.iter().all(|h| h.document_id != "d1"));
        assert!(hits.is_empty());
    }
}
