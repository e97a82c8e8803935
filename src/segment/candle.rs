//! Local boundary-classification model using Candle
//!
//! Loads a BERT token-classification checkpoint (safetensors) and scores
//! every token with a boundary logit.

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tracing::info;

use super::boundary::{BoundaryModel, InferenceOutput};

/// BERT-based boundary model
pub struct BertBoundaryModel {
    model: BertModel,
    classifier: Linear,
    device: Device,
}

impl BertBoundaryModel {
    /// Load a token-classification checkpoint from a local directory
    ///
    /// Expects `config.json` and `model.safetensors` with weights under the
    /// `bert.*` and `classifier.*` prefixes.
    pub fn new(model_path: &str) -> anyhow::Result<Self> {
        info!("Loading boundary model from {}", model_path);

        let device = Device::Cpu;
        let base = PathBuf::from(model_path);
        let config_path = base.join("config.json");
        let weights_path = base.join("model.safetensors");

        let config_content = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&config_content)?;

        // Label count from id2label when present, binary head otherwise
        let num_labels = serde_json::from_str::<serde_json::Value>(&config_content)
            .ok()
            .and_then(|v| v.get("id2label").and_then(|m| m.as_object().map(|o| o.len())))
            .unwrap_or(2);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };

        let model = BertModel::load(vb.pp("bert"), &config)
            .or_else(|_| BertModel::load(vb.clone(), &config))?;
        let classifier = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))?;

        info!(
            "Loaded boundary model: hidden {}, {} labels",
            config.hidden_size, num_labels
        );

        Ok(Self {
            model,
            classifier,
            device,
        })
    }
}

impl BoundaryModel for BertBoundaryModel {
    fn predict(&self, input_ids: &[i64], attention_mask: &[i64]) -> anyhow::Result<InferenceOutput> {
        let seq_len = input_ids.len();

        let ids: Vec<u32> = input_ids.iter().map(|&id| id as u32).collect();
        let mask: Vec<u32> = attention_mask.iter().map(|&m| m as u32).collect();

        let input_ids = Tensor::from_vec(ids, (1, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (1, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?.to_dtype(DType::F32)?;

        // Exported heads differ in rank; map each onto the closed variant set
        // so downstream thresholding sees one shape.
        match logits.dims() {
            [_, _, _] => Ok(InferenceOutput::Rank3(logits.to_vec3::<f32>()?)),
            [_, _] => Ok(InferenceOutput::Rank2(logits.to_vec2::<f32>()?)),
            [_] => Ok(InferenceOutput::Rank1(logits.to_vec1::<f32>()?)),
            dims => anyhow::bail!("Unsupported boundary output rank: {:?}", dims),
        }
    }
}
