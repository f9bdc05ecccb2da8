use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docqa_core::traits::Embedder;
use docqa_core::EmbeddingError;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

fn model_err(e: impl std::fmt::Display) -> EmbeddingError { EmbeddingError::Model(e.to_string()) }

/// BGE-M3 (XLM-RoBERTa) running in-process with candle.
///
/// `model_dir` must hold `tokenizer.json`, `config.json` and `pytorch_model.bin`.
pub struct LocalEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    dim: usize,
    id: String,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self, EmbeddingError> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Model(format!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| EmbeddingError::Model(format!("{}: {}", config_path.display(), e)))?;
        let json: serde_json::Value = serde_json::from_str(&raw).map_err(model_err)?;
        let dim = json.get("hidden_size").and_then(|v| v.as_u64()).ok_or_else(|| EmbeddingError::Model("config.json has no hidden_size".to_string()))? as usize;
        let config: XLMRobertaConfig = serde_json::from_value(json).map_err(model_err)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path).map_err(model_err)?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(model_err)?;
        let name = model_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "model".to_string());
        info!(dim, "embedding model loaded");
        Ok(Self { model, tokenizer, device, max_len, dim, id: format!("local:{name}") })
    }

    fn forward(&self, texts: &[String]) -> candle_core::Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        masked_mean_l2(&hidden, &attention_mask)?.to_device(&Device::Cpu)?.to_vec2()
    }
}

impl Embedder for LocalEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let out = self.forward(texts).map_err(model_err)?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "local embedding");
        Ok(out)
    }
}
