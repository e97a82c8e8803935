//! LLM module - text-generation providers for RAG
//!
//! Every provider supports both a one-shot `generate` (used for query
//! rewriting) and an incremental `generate_stream` (used for answer
//! generation). Fragments arrive in order; the stream ends when the provider
//! signals completion.

mod anthropic;
mod ollama;
mod openai;
mod simulated;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tracing::info;

/// An ordered, incrementally-produced sequence of answer text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Trait for text-generation collaborators
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One-shot generation with a system instruction
    async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String>;

    /// Streaming generation; fragments are yielded as they arrive
    async fn generate_stream(&self, system: &str, prompt: &str) -> anyhow::Result<TokenStream>;
}

/// LLM provider type
#[derive(Debug, Clone)]
pub enum LlmType {
    Ollama { host: Option<String> },
    OpenAI { api_key: Option<String>, base_url: Option<String> },
    Anthropic { api_key: Option<String>, base_url: Option<String> },
    Simulated,
}

/// Unified LLM provider
pub struct LlmProvider {
    model_name: String,
    inner: LlmProviderInner,
}

enum LlmProviderInner {
    Ollama(ollama::OllamaLlm),
    OpenAI(openai::OpenAILlm),
    Anthropic(anthropic::AnthropicLlm),
    Simulated(simulated::SimulatedLlm),
}

impl LlmProvider {
    /// Create a new LLM provider
    pub fn new(model_name: String, llm_type: LlmType) -> anyhow::Result<Self> {
        let inner = match llm_type {
            LlmType::Ollama { host } => {
                LlmProviderInner::Ollama(ollama::OllamaLlm::new(model_name.clone(), host)?)
            }
            LlmType::OpenAI { api_key, base_url } => {
                LlmProviderInner::OpenAI(openai::OpenAILlm::new(model_name.clone(), api_key, base_url)?)
            }
            LlmType::Anthropic { api_key, base_url } => {
                LlmProviderInner::Anthropic(anthropic::AnthropicLlm::new(model_name.clone(), api_key, base_url)?)
            }
            LlmType::Simulated => {
                LlmProviderInner::Simulated(simulated::SimulatedLlm::new(model_name.clone())?)
            }
        };

        info!("Initialized LLM provider: {}", model_name);

        Ok(Self { model_name, inner })
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl ChatModel for LlmProvider {
    async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        match &self.inner {
            LlmProviderInner::Ollama(llm) => llm.generate(system, prompt).await,
            LlmProviderInner::OpenAI(llm) => llm.generate(system, prompt).await,
            LlmProviderInner::Anthropic(llm) => llm.generate(system, prompt).await,
            LlmProviderInner::Simulated(llm) => llm.generate(system, prompt).await,
        }
    }

    async fn generate_stream(&self, system: &str, prompt: &str) -> anyhow::Result<TokenStream> {
        match &self.inner {
            LlmProviderInner::Ollama(llm) => llm.generate_stream(system, prompt).await,
            LlmProviderInner::OpenAI(llm) => llm.generate_stream(system, prompt).await,
            LlmProviderInner::Anthropic(llm) => llm.generate_stream(system, prompt).await,
            LlmProviderInner::Simulated(llm) => llm.generate_stream(system, prompt).await,
        }
    }
}
