//! Sentence embeddings via MiniLM (all-MiniLM-L6-v2) running on Candle.
//!
//! Every vector leaving this module is L2-normalized, which makes the
//! index's inner-product scores equivalent to cosine similarity. The
//! query path and the build path must use the same engine or retrieval
//! scores silently degrade.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use crate::errors::{Result, ScoutError};

/// Output dimension of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Text-to-vector function shared by the index builder and the retriever.
/// The seam exists so tests can substitute a deterministic stub.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    /// Embed a batch of texts; output vectors are unit length.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| ScoutError::Embedding("empty embedding batch".to_string()))
    }
}

/// MiniLM embedding engine. Loaded once at startup and treated as
/// read-only shared state for the life of the process.
pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingEngine {
    /// Download (or reuse from the hub cache) and load the model.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new()
            .map_err(|e| ScoutError::Embedding(format!("hub api init failed: {e}")))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| ScoutError::Embedding(format!("model config download failed: {e}")))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| ScoutError::Embedding(format!("tokenizer download failed: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| ScoutError::Embedding(format!("model weights download failed: {e}")))?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_contents)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ScoutError::Embedding(format!("tokenizer load failed: {e}")))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], candle_core::DType::F32, &device)
                .map_err(|e| ScoutError::Embedding(format!("weights load failed: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| ScoutError::Embedding(format!("model build failed: {e}")))?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn forward(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ScoutError::Embedding(format!("tokenization failed: {e}")))?;

        let batch_size = texts.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Pad token ids and attention masks to a rectangular batch
        let mut padded_ids = vec![0u32; batch_size * max_len];
        let mut padded_mask = vec![0u32; batch_size * max_len];
        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            padded_ids[row * max_len..row * max_len + ids.len()].copy_from_slice(ids);
            padded_mask[row * max_len..row * max_len + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(padded_ids, (batch_size, max_len), &self.device)
            .map_err(embed_err)?;
        let attention_mask = Tensor::from_vec(padded_mask, (batch_size, max_len), &self.device)
            .map_err(embed_err)?;
        let token_type_ids = token_ids.zeros_like().map_err(embed_err)?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))
            .map_err(embed_err)?;

        let pooled = mean_pool(&hidden, &attention_mask)?;
        let rows = pooled.to_vec2::<f32>().map_err(embed_err)?;

        Ok(rows.into_iter().map(|row| l2_normalize(&row)).collect())
    }
}

impl Embedder for EmbeddingEngine {
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts)
    }
}

fn embed_err(e: candle_core::Error) -> ScoutError {
    ScoutError::Embedding(e.to_string())
}

/// Attention-masked mean pooling over the token dimension.
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask
        .unsqueeze(2)
        .and_then(|m| m.expand(hidden.shape()))
        .and_then(|m| m.to_dtype(hidden.dtype()))
        .map_err(embed_err)?;

    let summed = (hidden * &mask).and_then(|t| t.sum(1)).map_err(embed_err)?;
    let counts = mask
        .sum(1)
        .and_then(|t| t.clamp(1e-9, f64::MAX))
        .map_err(embed_err)?;

    summed.broadcast_div(&counts).map_err(embed_err)
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}
