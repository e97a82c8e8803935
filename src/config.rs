//! Configuration file support for Gleaner
//!
//! Config file location: ~/.config/gleaner/config.toml
//!
//! Example config:
//! ```toml
//! [embedding]
//! provider = "openai"  # openai, ollama, simulated, local
//! model = "text-embedding-3-small"
//! dimensions = 1536
//!
//! [store]
//! provider = "qdrant"  # qdrant, memory
//! url = "http://localhost:6334"
//! collection = "passages"
//!
//! [llm]
//! provider = "ollama"
//! model = "qwen3:8b"
//!
//! [segmenter]
//! max_length = 512
//! boundary_threshold = 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub segmenter: SegmenterConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type: openai, ollama, simulated, local
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality; must match the vector collection
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Host for Ollama (e.g., http://localhost:11434)
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,

    /// API key for OpenAI (or set OPENAI_API_KEY)
    pub api_key: Option<String>,

    /// Local model directory (for the local provider)
    pub model_path: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            host: None,
            base_url: None,
            api_key: None,
            model_path: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store type: qdrant, memory
    #[serde(default = "default_store_provider")]
    pub provider: String,

    /// Base URL of the vector store REST API
    #[serde(default = "default_store_url")]
    pub url: Option<String>,

    /// Collection name holding passage vectors
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            url: default_store_url(),
            collection: default_collection(),
        }
    }
}

fn default_store_provider() -> String {
    "qdrant".to_string()
}

fn default_store_url() -> Option<String> {
    Some("http://localhost:6333".to_string())
}

fn default_collection() -> String {
    "passages".to_string()
}

/// Text-generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type: ollama, openai, simulated
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Host for Ollama
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,

    /// API key for OpenAI
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            host: None,
            base_url: None,
            api_key: None,
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "qwen3:8b".to_string()
}

/// Segmenter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Directory holding the boundary model and tokenizer (local-inference)
    pub model_path: Option<String>,

    /// Maximum token window per boundary-inference pass
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Sigmoid probability at or above which a token is a boundary
    #[serde(default = "default_boundary_threshold")]
    pub boundary_threshold: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            max_length: default_max_length(),
            boundary_threshold: default_boundary_threshold(),
        }
    }
}

fn default_max_length() -> usize {
    512
}

fn default_boundary_threshold() -> f32 {
    crate::segment::DEFAULT_BOUNDARY_THRESHOLD
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gleaner")
            .join("config.toml")
    }

    /// Load config from file, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Create example config file if it doesn't exist
    pub fn create_example_if_missing() -> anyhow::Result<bool> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(false);
        }

        let example = r#"# Gleaner Configuration
# Location: ~/.config/gleaner/config.toml

[embedding]
# Provider: openai, ollama, simulated, local
provider = "openai"

# Model name (provider-specific)
# OpenAI: text-embedding-3-small, text-embedding-3-large
# Ollama: nomic-embed-text, mxbai-embed-large
model = "text-embedding-3-small"

# Vector dimensionality; must match the collection below
dimensions = 1536

# Ollama host (default: http://localhost:11434)
# host = "http://localhost:11434"

# OpenAI-compatible base URL
# base_url = "http://localhost:1234/v1"

# API key (or set OPENAI_API_KEY)
# api_key = "sk-..."

# Local model directory (provider = "local", requires the local-inference feature)
# model_path = "/path/to/embedding-model"

[store]
# Vector store: qdrant, memory
provider = "qdrant"
url = "http://localhost:6333"
collection = "passages"

[llm]
# Provider: ollama, openai, simulated
provider = "ollama"
model = "qwen3:8b"

[segmenter]
# Directory holding the boundary model and tokenizer.json
# model_path = "/path/to/boundary-model"

# Maximum token window per boundary-inference pass
max_length = 512

# Sigmoid probability at or above which a token is a paragraph boundary
boundary_threshold = 0.5
"#;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, example)?;
        Ok(true)
    }
}
