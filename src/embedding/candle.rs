//! Local embeddings using Candle (sentence-transformers compatible)

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::info;

use super::pooling::{l2_normalize, masked_mean_pool};

/// Local embedding provider using Candle
pub struct CandleEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
    max_tokens: usize,
}

impl CandleEmbedding {
    /// Create a new Candle embedding provider
    ///
    /// `model_path` points at a local directory with config.json,
    /// tokenizer.json and model.safetensors; otherwise the model is fetched
    /// from the HuggingFace Hub by name.
    pub fn new(model_name: String, model_path: Option<String>) -> anyhow::Result<Self> {
        info!("Loading local embedding model: {}", model_name);

        let device = Device::Cpu;

        let (config_path, tokenizer_path, weights_path) = if let Some(path) = model_path {
            let base = PathBuf::from(path);
            (
                base.join("config.json"),
                base.join("tokenizer.json"),
                base.join("model.safetensors"),
            )
        } else {
            let api = Api::new()?;
            let repo = api.repo(Repo::new(model_name.clone(), RepoType::Model));

            let config = repo.get("config.json")?;
            let tokenizer = repo.get("tokenizer.json")?;
            let weights = repo
                .get("model.safetensors")
                .or_else(|_| repo.get("pytorch_model.bin"))?;

            (config, tokenizer, weights)
        };

        let config_content = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&config_content)?;
        let dimensions = config.hidden_size;
        let max_tokens = config.max_position_embeddings;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = if weights_path
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false)
        {
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(weights_path, DTYPE, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!("Loaded embedding model: {} dims, device: {:?}", dimensions, device);

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
            max_tokens,
        })
    }

    /// Get embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings for texts
    pub fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        // Truncate to the model's maximum sequence length
        let ids: Vec<u32> = encoding.get_ids().iter().take(self.max_tokens).copied().collect();
        let mask: Vec<u32> = encoding
            .get_attention_mask()
            .iter()
            .take(self.max_tokens)
            .copied()
            .collect();
        let seq_len = ids.len();

        if seq_len == 0 {
            return Ok(vec![0.0; self.dimensions]);
        }

        let attention_mask: Vec<i64> = mask.iter().map(|&m| m as i64).collect();

        let input_ids = Tensor::from_vec(ids, (1, seq_len), &self.device)?;
        let mask_tensor = Tensor::from_vec(mask, (1, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        // Last hidden state: [1, seq_len, hidden]
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&mask_tensor))?
            .to_dtype(DType::F32)?;

        let hidden = output
            .to_vec3::<f32>()?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty hidden state batch"))?;

        let mut pooled = masked_mean_pool(&hidden, &attention_mask);
        l2_normalize(&mut pooled);

        Ok(pooled)
    }
}
