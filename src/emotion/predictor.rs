//! Sentence-level emotion prediction.
//!
//! [`EmotionPredictor`] is the seam between the pipeline and the models.
//! [`OnnxEmotionPredictor`] runs fine-tuned transformer encoders exported to
//! ONNX with two inputs, `input_ids` and `attention_mask`, each shaped
//! `[1, max_tokens]`:
//!
//! - **classification**: one multitask model whose first two outputs are
//!   `[1, 3]` logits for valence and arousal; argmax maps {0,1,2} → {-1,0,1}.
//! - **regression**: separate valence and arousal models, each emitting a
//!   `[1, 1]` score that is rounded and clamped into {-1,0,1}.

use super::{Polarity, SentenceEmotion};
use crate::config::{PredictionMode, PredictorConfig};
use crate::error::{MoodError, Result};
use crate::models::{ModelResolver, build_session, load_tokenizer};
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Maps a sentence to its valence/arousal pair.
///
/// Implementations must not carry state between calls.
pub trait EmotionPredictor: Send + Sync {
    /// Predict the emotion of one sentence.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Inference`] if tokenization or inference fails.
    fn predict(&self, sentence: &str) -> Result<SentenceEmotion>;

    /// Strategy this predictor implements.
    fn mode(&self) -> PredictionMode;
}

/// Decode a 3-way logit vector into a polarity.
///
/// Ties resolve to the lowest index.
///
/// # Errors
///
/// Returns [`MoodError::Inference`] unless there are exactly three finite logits.
pub fn decode_class_logits(logits: &[f32]) -> Result<Polarity> {
    if logits.len() != 3 || logits.iter().any(|l| !l.is_finite()) {
        return Err(MoodError::Inference(format!(
            "expected 3 finite class logits, got {logits:?}"
        )));
    }
    let mut best = 0;
    for (i, &l) in logits.iter().enumerate().skip(1) {
        if l > logits[best] {
            best = i;
        }
    }
    Polarity::from_class_index(best)
        .ok_or_else(|| MoodError::Inference(format!("class index {best} out of range")))
}

/// Decode a single regression output into a polarity.
///
/// # Errors
///
/// Returns [`MoodError::Inference`] unless there is exactly one finite score.
pub fn decode_regression(output: &[f32]) -> Result<Polarity> {
    match output {
        [score] => Polarity::from_score(*score)
            .ok_or_else(|| MoodError::Inference(format!("non-finite regression score {score}"))),
        other => Err(MoodError::Inference(format!(
            "expected a single regression score, got {} values",
            other.len()
        ))),
    }
}

enum Heads {
    Multitask(Mutex<Session>),
    Separate {
        valence: Mutex<Session>,
        arousal: Mutex<Session>,
    },
}

/// ONNX Runtime emotion predictor.
///
/// Sessions sit behind mutexes because running a session needs exclusive
/// access; sentences are predicted one at a time.
pub struct OnnxEmotionPredictor {
    heads: Heads,
    tokenizer: tokenizers::Tokenizer,
    max_tokens: usize,
}

impl std::fmt::Debug for OnnxEmotionPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmotionPredictor")
            .field("mode", &self.mode())
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OnnxEmotionPredictor {
    /// Resolve and load the models for the configured strategy.
    ///
    /// In regression mode both models share the valence model's tokenizer.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Model`] if any artifact cannot be resolved or loaded.
    pub fn load(config: &PredictorConfig, resolver: &ModelResolver) -> Result<Self> {
        let (heads, tokenizer_path) = match config.mode {
            PredictionMode::Classification => {
                let paths = resolver.resolve(&config.multitask)?;
                let session = build_session(&paths.model, config.intra_threads)?;
                (Heads::Multitask(Mutex::new(session)), paths.tokenizer)
            }
            PredictionMode::Regression => {
                let valence = resolver.resolve(&config.valence)?;
                let arousal = resolver.resolve(&config.arousal)?;
                let heads = Heads::Separate {
                    valence: Mutex::new(build_session(&valence.model, config.intra_threads)?),
                    arousal: Mutex::new(build_session(&arousal.model, config.intra_threads)?),
                };
                (heads, valence.tokenizer)
            }
        };

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        configure_fixed_length(&mut tokenizer, config.max_tokens)?;

        let predictor = Self {
            heads,
            tokenizer,
            max_tokens: config.max_tokens,
        };
        info!(
            "emotion predictor ready (mode={:?}, max_tokens={})",
            predictor.mode(),
            predictor.max_tokens
        );
        Ok(predictor)
    }

    /// Encode one sentence; `token_type_ids` is added as all zeros when the
    /// model declares it.
    fn encode(
        &self,
        sentence: &str,
        with_token_types: bool,
    ) -> Result<HashMap<String, SessionInputValue<'static>>> {
        let encoding = self
            .tokenizer
            .encode(sentence, true)
            .map_err(|e| MoodError::Inference(format!("tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        let seq_len = input_ids.len();

        let ids_tensor = Tensor::from_array(([1, seq_len], input_ids))
            .map_err(|e| MoodError::Inference(format!("failed to create input_ids tensor: {e}")))?;
        let mask_tensor = Tensor::from_array(([1, seq_len], attention_mask)).map_err(|e| {
            MoodError::Inference(format!("failed to create attention_mask tensor: {e}"))
        })?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert("input_ids".to_owned(), ids_tensor.into());
        feed.insert("attention_mask".to_owned(), mask_tensor.into());
        if with_token_types {
            let types_tensor = Tensor::from_array(([1, seq_len], vec![0i64; seq_len]))
                .map_err(|e| {
                    MoodError::Inference(format!("failed to create token_type_ids tensor: {e}"))
                })?;
            feed.insert("token_type_ids".to_owned(), types_tensor.into());
        }
        Ok(feed)
    }

    /// Run one session and copy out its first `n_outputs` tensors.
    fn run(&self, session: &Mutex<Session>, sentence: &str, n_outputs: usize) -> Result<Vec<Vec<f32>>> {
        let mut session = session
            .lock()
            .map_err(|_| MoodError::Inference("emotion model lock poisoned".to_owned()))?;
        let with_token_types = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");
        let feed = self.encode(sentence, with_token_types)?;
        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| MoodError::Inference(format!("ONNX inference failed: {e}")))?;

        if outputs.len() < n_outputs {
            return Err(MoodError::Inference(format!(
                "model produced {} outputs, expected {n_outputs}",
                outputs.len()
            )));
        }

        (0..n_outputs)
            .map(|i| {
                outputs[i]
                    .try_extract_tensor::<f32>()
                    .map(|(_shape, data)| data.to_vec())
                    .map_err(|e| {
                        MoodError::Inference(format!("failed to extract output tensor {i}: {e}"))
                    })
            })
            .collect()
    }
}

impl EmotionPredictor for OnnxEmotionPredictor {
    fn predict(&self, sentence: &str) -> Result<SentenceEmotion> {
        match self.heads {
            Heads::Multitask(ref session) => {
                let outputs = self.run(session, sentence, 2)?;
                Ok(SentenceEmotion::new(
                    decode_class_logits(&outputs[0])?,
                    decode_class_logits(&outputs[1])?,
                ))
            }
            Heads::Separate {
                ref valence,
                ref arousal,
            } => {
                let v = self.run(valence, sentence, 1)?;
                let a = self.run(arousal, sentence, 1)?;
                Ok(SentenceEmotion::new(
                    decode_regression(&v[0])?,
                    decode_regression(&a[0])?,
                ))
            }
        }
    }

    fn mode(&self) -> PredictionMode {
        match self.heads {
            Heads::Multitask(_) => PredictionMode::Classification,
            Heads::Separate { .. } => PredictionMode::Regression,
        }
    }
}

/// Truncate and pad every encoding to exactly `max_tokens`.
///
/// Keeps the pad token declared in `tokenizer.json` when there is one,
/// otherwise looks up `[PAD]` or `<pad>` in the vocabulary.
pub(crate) fn configure_fixed_length(
    tokenizer: &mut tokenizers::Tokenizer,
    max_tokens: usize,
) -> Result<()> {
    let truncation = tokenizers::TruncationParams {
        max_length: max_tokens,
        ..Default::default()
    };
    tokenizer
        .with_truncation(Some(truncation))
        .map_err(|e| MoodError::Model(format!("tokenizer truncation config failed: {e}")))?;

    let mut padding = match tokenizer.get_padding() {
        Some(p) => p.clone(),
        None => {
            let mut p = tokenizers::PaddingParams::default();
            for token in ["[PAD]", "<pad>"] {
                if let Some(id) = tokenizer.token_to_id(token) {
                    p.pad_id = id;
                    p.pad_token = token.to_owned();
                    break;
                }
            }
            p
        }
    };
    padding.strategy = tokenizers::PaddingStrategy::Fixed(max_tokens);
    tokenizer.with_padding(Some(padding));
    Ok(())
}
