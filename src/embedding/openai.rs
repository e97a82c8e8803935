//! OpenAI embedding provider

use std::env;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use tracing::info;

use super::truncate::{get_token_limit, truncate_to_token_limit};

/// OpenAI embedding provider
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model_name: String,
    dimensions: usize,
    token_limit: usize,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider with a fixed output dimensionality
    pub fn new(
        model_name: String,
        dimensions: usize,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(base_url) = base_url.or_else(|| env::var("OPENAI_BASE_URL").ok()) {
            config = config.with_api_base(base_url);
        }

        let client = Client::with_config(config);
        let token_limit = get_token_limit(&model_name);

        info!(
            "OpenAI embedding provider: {} ({} dims)",
            model_name, dimensions
        );

        Ok(Self {
            client,
            model_name,
            dimensions,
            token_limit,
        })
    }

    /// Get dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings
    pub async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts_vec: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let texts_vec = truncate_to_token_limit(&texts_vec, self.token_limit);

        // Process in batches of 100 (OpenAI limit)
        let batch_size = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts_vec.chunks(batch_size) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model_name)
                .input(EmbeddingInput::StringArray(batch.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()?;

            let response = self.client.embeddings().create(request).await?;

            for embedding_data in response.data {
                all_embeddings.push(embedding_data.embedding);
            }
        }

        Ok(all_embeddings)
    }
}
