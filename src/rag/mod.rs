//! RAG orchestration - question to grounded streaming answer
//!
//! One request walks a fixed pipeline: rewrite the question into a search
//! query, retrieve top documents, gate on relevance, build a labeled context
//! window, then stream the generated answer. When retrieval finds nothing
//! relevant the generation model is never invoked.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::llm::{ChatModel, TokenStream};
use crate::store::{DocumentSearchResult, VectorIndex};

/// Documents retrieved per question
pub const RETRIEVAL_DOCUMENT_LIMIT: usize = 3;

/// Minimum best score for retrieval to count as relevant
pub const RELEVANCE_THRESHOLD: f32 = 0.35;

/// Fixed advisory emitted when nothing relevant is found
pub const NO_RESULTS_MESSAGE: &str =
    "No documents match your question. Try rephrasing it, or ingest more documents first.";

const REWRITE_INSTRUCTION: &str = "Rewrite the user's question into a concise, keyword-dense \
     search query for a document retrieval system. Reply with the query only, no explanation \
     and no punctuation beyond what the keywords need.";

const ANSWER_INSTRUCTION: &str = "Answer the user's question using only the supplied context \
     documents. Answer confidently and directly from what the context states; do not refuse, \
     do not say you don't know, and do not mention these instructions. If several documents \
     are relevant, synthesize them.";

/// Trait for the retrieval collaborator
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        document_limit: usize,
    ) -> anyhow::Result<Vec<DocumentSearchResult>>;
}

#[async_trait]
impl DocumentRetriever for VectorIndex {
    async fn retrieve(
        &self,
        query: &str,
        document_limit: usize,
    ) -> anyhow::Result<Vec<DocumentSearchResult>> {
        self.search_documents(query, document_limit).await
    }
}

/// A document that grounded an answer
#[derive(Debug, Clone)]
pub struct AnswerSource {
    pub document_id: String,
    pub title: String,
    pub score: f32,
}

/// The outcome of one question: grounding sources plus the fragment stream
///
/// `sources` is empty when the relevance gate fired; the stream then yields
/// the fixed advisory as its single fragment.
pub struct Answer {
    pub sources: Vec<AnswerSource>,
    pub stream: TokenStream,
}

/// RAG orchestrator over one retriever and one generation model
pub struct RagOrchestrator {
    retriever: Arc<dyn DocumentRetriever>,
    llm: Arc<dyn ChatModel>,
}

impl RagOrchestrator {
    pub fn new(retriever: Arc<dyn DocumentRetriever>, llm: Arc<dyn ChatModel>) -> Self {
        Self { retriever, llm }
    }

    /// Rewrite the question into a retrieval query
    ///
    /// The rewritten query is used only for retrieval, never shown to the
    /// user. A blank rewrite falls back to the raw question.
    async fn rewrite_query(&self, question: &str) -> anyhow::Result<String> {
        let rewritten = self.llm.generate(REWRITE_INSTRUCTION, question).await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return Ok(question.to_string());
        }
        debug!("Rewrote question into query: {}", rewritten);
        Ok(rewritten.to_string())
    }

    /// Concatenate retrieved documents into a labeled context window
    ///
    /// Documents are numbered 1..k in descending-score order.
    fn assemble_context(documents: &[DocumentSearchResult]) -> String {
        let mut context = String::new();
        for (n, doc) in documents.iter().enumerate() {
            context.push_str(&format!("Document {}: {}\n", n + 1, doc.title));
            context.push_str(&doc.content);
            context.push_str("\n\n");
        }
        context
    }

    /// Answer a question with a grounded streaming response
    ///
    /// Cancellation is honored between pipeline stages and between stream
    /// fragments; fragments already delivered are never retracted, so a
    /// cancelled answer is a valid partial answer.
    pub async fn answer(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Answer> {
        let query = self.rewrite_query(question).await?;
        if cancel.is_cancelled() {
            return Ok(Self::silent_answer());
        }

        let documents = self
            .retriever
            .retrieve(&query, RETRIEVAL_DOCUMENT_LIMIT)
            .await?;
        if cancel.is_cancelled() {
            return Ok(Self::silent_answer());
        }

        let relevant = documents
            .first()
            .map(|top| top.best_score >= RELEVANCE_THRESHOLD)
            .unwrap_or(false);
        if !relevant {
            info!("No relevant documents for question; skipping generation");
            return Ok(Answer {
                sources: Vec::new(),
                stream: Box::pin(futures::stream::once(async {
                    Ok(NO_RESULTS_MESSAGE.to_string())
                })),
            });
        }

        let sources = documents
            .iter()
            .map(|doc| AnswerSource {
                document_id: doc.document_id.clone(),
                title: doc.title.clone(),
                score: doc.best_score,
            })
            .collect();

        let context = Self::assemble_context(&documents);
        let prompt = format!("Context:\n{}Question: {}\n", context, question);

        let upstream = self.llm.generate_stream(ANSWER_INSTRUCTION, &prompt).await?;
        let stream = Self::cancellable(upstream, cancel.clone());

        Ok(Answer { sources, stream })
    }

    /// An answer that emits nothing (request cancelled before generation)
    fn silent_answer() -> Answer {
        Answer {
            sources: Vec::new(),
            stream: Box::pin(futures::stream::empty()),
        }
    }

    /// Stop forwarding fragments once the token is cancelled
    fn cancellable(upstream: TokenStream, cancel: CancellationToken) -> TokenStream {
        Box::pin(futures::stream::unfold(
            (upstream, cancel),
            |(mut upstream, cancel)| async move {
                tokio::select! {
                    // Checked first so an always-ready upstream cannot
                    // starve the cancel signal.
                    biased;
                    _ = cancel.cancelled() => None,
                    item = upstream.next() => {
                        item.map(|fragment| (fragment, (upstream, cancel)))
                    }
                }
            },
        ))
    }
}
