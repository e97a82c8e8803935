//! Token truncation for remote embedding providers

use tiktoken_rs::cl100k_base;
use tracing::warn;

/// Token limits for supported embedding models
pub fn get_token_limit(model_name: &str) -> usize {
    let base_name = model_name.split(':').next().unwrap_or(model_name);

    match base_name {
        // OpenAI models
        "text-embedding-3-small" | "text-embedding-3-large" | "text-embedding-ada-002" => 8192,

        // Ollama models
        "nomic-embed-text" | "nomic-embed-text-v1.5" => 2048,
        "mxbai-embed-large" => 512,
        "all-minilm" => 512,
        "bge-m3" => 8192,

        // Default fallback
        _ => 2048,
    }
}

/// Truncate texts to fit within a token limit
pub fn truncate_to_token_limit(texts: &[String], token_limit: usize) -> Vec<String> {
    if texts.is_empty() {
        return Vec::new();
    }

    let bpe = cl100k_base().expect("Failed to load tiktoken encoding");

    let mut truncated = Vec::with_capacity(texts.len());
    let mut truncation_count = 0;

    for (i, text) in texts.iter().enumerate() {
        let tokens = bpe.encode_with_special_tokens(text);
        let original_length = tokens.len();

        if original_length <= token_limit {
            truncated.push(text.clone());
        } else {
            let kept: Vec<u32> = tokens.into_iter().take(token_limit).collect();
            let truncated_text = bpe
                .decode(kept)
                .unwrap_or_else(|_| text[..text.len().min(token_limit * 4)].to_string());

            truncated.push(truncated_text);
            truncation_count += 1;

            if truncation_count <= 3 {
                warn!(
                    "Passage {} truncated: {} → {} tokens",
                    i + 1,
                    original_length,
                    token_limit
                );
            }
        }
    }

    if truncation_count > 3 {
        warn!(
            "Truncation summary: {}/{} passages truncated",
            truncation_count,
            texts.len()
        );
    }

    truncated
}
