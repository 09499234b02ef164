//! Configuration types for the recommendation pipeline.

use crate::error::{MoodError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for emotion analysis and song recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    /// Emotion predictor settings (strategy and model artifacts).
    pub predictor: PredictorConfig,
    /// Sentence-embedding model used for keyword extraction and similarity.
    pub embedding: EmbeddingConfig,
    /// Keyword extraction settings.
    pub keywords: KeywordConfig,
    /// Intensity band thresholds.
    pub intensity: IntensityConfig,
    /// Ranking settings.
    pub ranking: RankingConfig,
    /// Song catalog source.
    pub catalog: CatalogConfig,
    /// Request-level runtime limits.
    pub runtime: RuntimeConfig,
    /// Model download cache.
    pub models: ModelConfig,
}

/// Which emotion prediction strategy to load at startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// One multitask model with a 3-way head per axis.
    #[default]
    Classification,
    /// Two single-output models, one per axis.
    Regression,
}

/// Location of one ONNX model plus its tokenizer.
///
/// When `local_dir` is set both files are read from it and the Hub is never
/// contacted; otherwise they are resolved inside `repo_id` via `hf-hub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSource {
    /// HuggingFace repo ID.
    pub repo_id: String,
    /// Directory holding pre-exported files.
    pub local_dir: Option<PathBuf>,
    /// ONNX model filename (relative to the repo or `local_dir`).
    pub model_file: String,
    /// Tokenizer filename (relative to the repo or `local_dir`).
    pub tokenizer_file: String,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            repo_id: String::new(),
            local_dir: None,
            model_file: "model.onnx".to_owned(),
            tokenizer_file: "tokenizer.json".to_owned(),
        }
    }
}

impl ModelSource {
    /// A source backed by files in a local directory.
    pub fn local(dir: impl Into<PathBuf>, model_file: &str) -> Self {
        Self {
            local_dir: Some(dir.into()),
            model_file: model_file.to_owned(),
            ..Self::default()
        }
    }

    /// A source backed by a HuggingFace Hub repository.
    pub fn hub(repo_id: &str, model_file: &str) -> Self {
        Self {
            repo_id: repo_id.to_owned(),
            model_file: model_file.to_owned(),
            ..Self::default()
        }
    }

    /// Human-readable location used in log lines.
    pub fn describe(&self) -> String {
        match self.local_dir {
            Some(ref dir) => dir.join(&self.model_file).display().to_string(),
            None => format!("{}/{}", self.repo_id, self.model_file),
        }
    }
}

/// Emotion predictor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Prediction strategy.
    pub mode: PredictionMode,
    /// Multitask model (classification mode only).
    pub multitask: ModelSource,
    /// Valence model (regression mode only).
    pub valence: ModelSource,
    /// Arousal model (regression mode only).
    pub arousal: ModelSource,
    /// Fixed token length every sentence is truncated or padded to.
    pub max_tokens: usize,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            mode: PredictionMode::default(),
            multitask: ModelSource::local("models/emotion", "multitask.onnx"),
            valence: ModelSource::local("models/emotion", "valence.onnx"),
            arousal: ModelSource::local("models/emotion", "arousal.onnx"),
            max_tokens: 64,
            intra_threads: 2,
        }
    }
}

/// Sentence-embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model artifacts.
    pub source: ModelSource,
    /// Maximum token sequence length for a single phrase or document.
    pub max_tokens: usize,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
    /// Force feeding `token_type_ids` on or off. When unset, the tensor is
    /// fed only if the loaded model declares a `token_type_ids` input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_token_type_ids: Option<bool>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            // Multilingual MiniLM: handles Korean diary text, 384-dim output.
            source: ModelSource::hub(
                "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
                "onnx/model.onnx",
            ),
            max_tokens: 128,
            intra_threads: 2,
            use_token_type_ids: None,
        }
    }
}

/// Keyword extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Number of keyword phrases to keep.
    pub top_n: usize,
    /// Shortest candidate phrase, in words.
    pub ngram_min: usize,
    /// Longest candidate phrase, in words.
    pub ngram_max: usize,
    /// Newline-separated stop-word file (None = no stop words).
    pub stopwords_path: Option<PathBuf>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            ngram_min: 1,
            ngram_max: 2,
            stopwords_path: Some(PathBuf::from("stopwords-ko.txt")),
        }
    }
}

/// Intensity band thresholds on the distance from the neutral origin.
///
/// A distance below `low` is neutral; `[low, medium)` is low;
/// `[medium, high)` is medium; `high` and above is high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityConfig {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            low: crate::emotion::NEUTRAL_THRESHOLD,
            medium: 0.5,
            high: 0.8,
        }
    }
}

/// What to do when an input vector and a song vector differ in length.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Truncate both to the shorter length.
    #[default]
    Truncate,
    /// Fail the request with a dimension mismatch error.
    Strict,
}

/// Ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of songs returned per request.
    pub top_k: usize,
    /// Dimension alignment policy.
    pub dimension_policy: DimensionPolicy,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            dimension_policy: DimensionPolicy::default(),
        }
    }
}

/// Storage format of the song catalog.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// SQLite database with a songs table.
    #[default]
    Sqlite,
    /// JSON array of song rows.
    Json,
    /// CSV file with a header row; the embedding column holds a JSON list.
    Csv,
}

/// Song catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Storage format.
    pub kind: CatalogKind,
    /// Database, JSON or CSV file path.
    pub path: PathBuf,
    /// Table name (SQLite only).
    pub table: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            kind: CatalogKind::default(),
            path: PathBuf::from("tracks.db"),
            table: "songs".to_owned(),
        }
    }
}

/// Request-level limits for the async entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-request deadline in milliseconds (0 disables the deadline).
    pub request_timeout_ms: u64,
    /// Maximum number of requests running inference at the same time.
    pub max_concurrent_inference: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_concurrent_inference: 1,
        }
    }
}

/// Model download cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory where `hf-hub` stores downloaded files.
    pub cache_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("moodlist")
                .join("models"),
        }
    }
}

impl MoodConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| MoodError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| MoodError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/moodlist/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("moodlist")
            .join("config.toml")
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let t = &self.intensity;
        if !(t.low > 0.0 && t.low < t.medium && t.medium < t.high) {
            return Err(MoodError::Config(format!(
                "intensity thresholds must be positive and strictly ascending, got {}/{}/{}",
                t.low, t.medium, t.high
            )));
        }
        if self.ranking.top_k == 0 {
            return Err(MoodError::Config("ranking.top_k must be at least 1".into()));
        }
        let k = &self.keywords;
        if k.top_n == 0 {
            return Err(MoodError::Config("keywords.top_n must be at least 1".into()));
        }
        if k.ngram_min == 0 || k.ngram_min > k.ngram_max {
            return Err(MoodError::Config(format!(
                "keywords n-gram range {}..={} is invalid",
                k.ngram_min, k.ngram_max
            )));
        }
        if self.predictor.max_tokens == 0 || self.embedding.max_tokens == 0 {
            return Err(MoodError::Config("max_tokens must be at least 1".into()));
        }
        if self.runtime.max_concurrent_inference == 0 {
            return Err(MoodError::Config(
                "runtime.max_concurrent_inference must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
