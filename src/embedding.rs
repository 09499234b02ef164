//! Sentence embeddings for keyword extraction and song similarity.
//!
//! Uses a multilingual sentence-transformers model via ONNX Runtime. The
//! model is downloaded from HuggingFace Hub on first use and cached by
//! `hf-hub`.
//!
//! # Pipeline
//!
//! ```text
//! text → tokenizer → ONNX model → mean-pool → L2-normalize → f32 vector
//! ```

use crate::config::EmbeddingConfig;
use crate::error::{MoodError, Result};
use crate::models::{ModelResolver, build_session, load_tokenizer};
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Encodes text into dense vectors.
pub trait TextEmbedder: Send + Sync {
    /// Embed several texts, one vector per input, in order.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Inference`] if tokenization or inference fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Inference`] if tokenization or inference fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| MoodError::Inference("embedder returned no vectors".to_owned()))
    }
}

/// Sentence embedding engine backed by an ONNX sentence-transformers export.
///
/// The session sits behind a mutex because running it needs exclusive access.
pub struct EmbeddingEngine {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    use_token_type_ids: bool,
}

impl std::fmt::Debug for EmbeddingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEngine")
            .field("use_token_type_ids", &self.use_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl EmbeddingEngine {
    /// Resolve and load the configured embedding model.
    ///
    /// # Errors
    ///
    /// Returns an error if the ONNX model or tokenizer cannot be loaded.
    pub fn load(config: &EmbeddingConfig, resolver: &ModelResolver) -> Result<Self> {
        let paths = resolver.resolve(&config.source)?;
        let session = build_session(&paths.model, config.intra_threads)?;
        let input_names: Vec<&str> = session.inputs().iter().map(|i| i.name()).collect();
        let use_token_type_ids = feeds_token_type_ids(config.use_token_type_ids, &input_names);
        let mut tokenizer = load_tokenizer(&paths.tokenizer)?;

        // Enforce max-length truncation so long diaries don't blow up.
        let truncation = tokenizers::TruncationParams {
            max_length: config.max_tokens,
            ..Default::default()
        };
        tokenizer
            .with_truncation(Some(truncation))
            .map_err(|e| MoodError::Model(format!("tokenizer truncation config failed: {e}")))?;

        // Batches are padded by hand to the longest sequence.
        tokenizer.with_padding(None);

        info!(
            "embedding engine ready ({}, token_type_ids={use_token_type_ids})",
            config.source.describe()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            use_token_type_ids,
        })
    }
}

/// Whether to feed `token_type_ids`: the configured override, else whether
/// the model declares the input.
fn feeds_token_type_ids(configured: Option<bool>, model_inputs: &[&str]) -> bool {
    configured.unwrap_or_else(|| model_inputs.contains(&"token_type_ids"))
}

impl TextEmbedder for EmbeddingEngine {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings: Vec<tokenizers::Encoding> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(*t, true)
                    .map_err(|e| MoodError::Inference(format!("tokenization failed: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);
        let batch_size = texts.len();

        let mut all_ids = vec![0i64; batch_size * max_len];
        let mut all_mask = vec![0i64; batch_size * max_len];
        let mut all_types = vec![0i64; batch_size * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let offset = i * max_len;
            for (j, &id) in enc.get_ids().iter().enumerate() {
                all_ids[offset + j] = i64::from(id);
            }
            for (j, &m) in enc.get_attention_mask().iter().enumerate() {
                all_mask[offset + j] = i64::from(m);
            }
            for (j, &t) in enc.get_type_ids().iter().enumerate() {
                all_types[offset + j] = i64::from(t);
            }
        }

        let ids_tensor = Tensor::from_array(([batch_size, max_len], all_ids))
            .map_err(|e| MoodError::Inference(format!("input_ids tensor failed: {e}")))?;
        let mask_tensor = Tensor::from_array(([batch_size, max_len], all_mask.clone()))
            .map_err(|e| MoodError::Inference(format!("attention_mask tensor failed: {e}")))?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert("input_ids".to_owned(), ids_tensor.into());
        feed.insert("attention_mask".to_owned(), mask_tensor.into());
        if self.use_token_type_ids {
            let type_tensor = Tensor::from_array(([batch_size, max_len], all_types))
                .map_err(|e| MoodError::Inference(format!("token_type_ids tensor failed: {e}")))?;
            feed.insert("token_type_ids".to_owned(), type_tensor.into());
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| MoodError::Inference("embedding model lock poisoned".to_owned()))?;
        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| MoodError::Inference(format!("ONNX inference failed: {e}")))?;

        // Output shape: [batch, seq_len, dim], token-level embeddings.
        let (_shape, data) = outputs[0_usize]
            .try_extract_tensor::<f32>()
            .map_err(|e| MoodError::Inference(format!("failed to extract output tensor: {e}")))?;

        let tokens = batch_size * max_len;
        if data.is_empty() || data.len() % tokens != 0 {
            return Err(MoodError::Inference(format!(
                "unexpected embedding output of {} values for {tokens} tokens",
                data.len()
            )));
        }
        let dim = data.len() / tokens;

        let mut results = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let start = i * max_len * dim;
            let slice = &data[start..start + max_len * dim];
            let mask_slice = &all_mask[i * max_len..(i + 1) * max_len];
            let pooled = mean_pool(slice, mask_slice, dim);
            results.push(l2_normalize(&pooled));
        }

        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

/// Mean-pool token embeddings using attention mask.
///
/// `flat` is shape `[mask.len(), dim]` stored row-major.
/// `mask` is `[seq_len]` with 1 for real tokens, 0 for padding.
fn mean_pool(flat: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut count = 0.0f32;

    for (t, &m) in mask.iter().enumerate() {
        if m != 0 {
            let offset = t * dim;
            for (p, &f) in pooled.iter_mut().zip(&flat[offset..offset + dim]) {
                *p += f;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for p in &mut pooled {
            *p /= count;
        }
    }

    pooled
}

/// L2-normalize a vector (returns new vec).
fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < 1e-12 {
        return vec.to_vec();
    }
    vec.iter().map(|x| x / norm).collect()
}

/// Element-wise mean of equal-length vectors.
///
/// Returns `None` for an empty slice or when the lengths differ.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    if vectors.iter().any(|v| v.len() != dim) {
        return None;
    }
    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (m, &x) in mean.iter_mut().zip(v) {
            *m += x;
        }
    }
    let n = vectors.len() as f32;
    for m in &mut mean {
        *m /= n;
    }
    Some(mean)
}

/// Compute cosine similarity between two vectors.
///
/// Only the shared prefix is compared when the lengths differ. Returns a
/// value in `[-1.0, 1.0]`, or 0.0 if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < 1e-12 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
