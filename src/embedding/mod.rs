//! Embedding module - map passage text to fixed-length vectors

mod ollama;
mod openai;
mod pooling;
mod simulated;
mod truncate;

#[cfg(feature = "local-inference")]
mod candle;

pub use pooling::{l2_normalize, masked_mean_pool};

use tracing::info;

/// Embedding mode configuration
#[derive(Debug, Clone)]
pub enum EmbeddingMode {
    OpenAI {
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        host: Option<String>,
    },
    /// Deterministic offline embeddings; no model, no network
    Simulated,
    #[cfg(feature = "local-inference")]
    Local {
        model_path: Option<String>,
    },
}

/// Unified embedding provider
///
/// Stateless per call: the same text always yields the same vector of the
/// configured dimensionality, shared by the vector collection.
pub struct EmbeddingProvider {
    dimensions: usize,
    inner: EmbeddingProviderInner,
}

enum EmbeddingProviderInner {
    OpenAI(openai::OpenAIEmbedding),
    Ollama(ollama::OllamaEmbedding),
    Simulated(simulated::SimulatedEmbedding),
    #[cfg(feature = "local-inference")]
    Local(candle::CandleEmbedding),
}

impl EmbeddingProvider {
    /// Create a new embedding provider
    pub fn new(model_name: String, dimensions: usize, mode: EmbeddingMode) -> anyhow::Result<Self> {
        let (inner, dimensions) = match mode {
            EmbeddingMode::OpenAI { api_key, base_url } => {
                let provider =
                    openai::OpenAIEmbedding::new(model_name.clone(), dimensions, api_key, base_url)?;
                let dims = provider.dimensions();
                (EmbeddingProviderInner::OpenAI(provider), dims)
            }
            EmbeddingMode::Ollama { host } => {
                let provider = ollama::OllamaEmbedding::new(model_name.clone(), dimensions, host)?;
                let dims = provider.dimensions();
                (EmbeddingProviderInner::Ollama(provider), dims)
            }
            EmbeddingMode::Simulated => {
                let provider = simulated::SimulatedEmbedding::new(dimensions);
                let dims = provider.dimensions();
                (EmbeddingProviderInner::Simulated(provider), dims)
            }
            #[cfg(feature = "local-inference")]
            EmbeddingMode::Local { model_path } => {
                let provider = candle::CandleEmbedding::new(model_name.clone(), model_path)?;
                let dims = provider.dimensions();
                (EmbeddingProviderInner::Local(provider), dims)
            }
        };

        info!(
            "Initialized embedding provider: {} ({} dims)",
            model_name, dimensions
        );

        Ok(Self { dimensions, inner })
    }

    /// Get embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text
    ///
    /// Blank input returns an empty vector, not an error.
    pub async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = self.dispatch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding provider returned no vector"))
    }

    /// Embed a batch of texts
    ///
    /// Blank entries are filtered out before dispatch; the output corresponds
    /// one-to-one with the remaining texts in their original order.
    pub async fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let non_blank: Vec<&str> = texts
            .iter()
            .copied()
            .filter(|t| !t.trim().is_empty())
            .collect();

        if non_blank.is_empty() {
            return Ok(Vec::new());
        }

        self.dispatch(&non_blank).await
    }

    async fn dispatch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        match &self.inner {
            EmbeddingProviderInner::OpenAI(p) => p.embed(texts).await,
            EmbeddingProviderInner::Ollama(p) => p.embed(texts).await,
            EmbeddingProviderInner::Simulated(p) => Ok(p.embed(texts)),
            #[cfg(feature = "local-inference")]
            EmbeddingProviderInner::Local(p) => p.embed(texts),
        }
    }
}
