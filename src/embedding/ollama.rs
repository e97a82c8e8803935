//! Ollama embedding provider

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{check_response, create_client};

use super::truncate::{get_token_limit, truncate_to_token_limit};

/// Ollama embedding provider
pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
    dimensions: usize,
    token_limit: usize,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding provider
    pub fn new(model_name: String, dimensions: usize, host: Option<String>) -> anyhow::Result<Self> {
        let host = host
            .or_else(|| env::var("GLEANER_OLLAMA_HOST").ok())
            .or_else(|| env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let client = create_client();
        let token_limit = get_token_limit(&model_name);

        info!(
            "Ollama embedding provider: {} @ {} ({} dims)",
            model_name, host, dimensions
        );

        Ok(Self {
            client,
            host,
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

        // Process in batches of 32 (Ollama recommendation)
        let batch_size = 32;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts_vec.chunks(batch_size) {
            let request = EmbedRequest {
                model: self.model_name.clone(),
                input: batch.to_vec(),
            };

            let response = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&request)
                .send()
                .await?;

            let response = check_response(response, "Ollama").await?;
            let embed_response: EmbedResponse = response.json().await?;
            all_embeddings.extend(embed_response.embeddings);
        }

        Ok(all_embeddings)
    }
}
