//! Model artifact resolution via hf-hub, plus shared ONNX/tokenizer loading.

use crate::config::{ModelConfig, ModelSource};
use crate::error::{MoodError, Result};
use ort::session::Session;
use std::path::{Path, PathBuf};
use tracing::info;

/// Local paths of one model and its tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Resolves [`ModelSource`]s to files on disk, downloading from the Hub
/// into the configured cache when needed.
pub struct ModelResolver {
    cache_dir: PathBuf,
}

impl ModelResolver {
    /// Create a resolver rooted at the configured cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.cache_dir)?;
        info!("model cache directory: {}", config.cache_dir.display());
        Ok(Self {
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// Get local paths for a model source, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Model`] if a local file is missing or a download fails.
    pub fn resolve(&self, source: &ModelSource) -> Result<ModelPaths> {
        if let Some(ref dir) = source.local_dir {
            let paths = ModelPaths {
                model: dir.join(&source.model_file),
                tokenizer: dir.join(&source.tokenizer_file),
            };
            for path in [&paths.model, &paths.tokenizer] {
                if !path.is_file() {
                    return Err(MoodError::Model(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
            }
            return Ok(paths);
        }

        if source.repo_id.is_empty() {
            return Err(MoodError::Model(
                "model source needs either repo_id or local_dir".to_owned(),
            ));
        }

        Ok(ModelPaths {
            model: self.get_model_path(&source.repo_id, &source.model_file)?,
            tokenizer: self.get_model_path(&source.repo_id, &source.tokenizer_file)?,
        })
    }

    /// Get the path to a cached Hub file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be downloaded.
    pub fn get_model_path(&self, repo_id: &str, filename: &str) -> Result<PathBuf> {
        if let Some(path) = self.cached_path(repo_id, filename) {
            return Ok(path);
        }

        info!("downloading {repo_id}/{filename}");
        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .build()
            .map_err(|e| MoodError::Model(format!("failed to create HF API: {e}")))?;

        api.model(repo_id.to_owned()).get(filename).map_err(|e| {
            MoodError::Model(format!("failed to download {filename} from {repo_id}: {e}"))
        })
    }

    /// Path of a Hub file if it is already in the cache.
    pub fn cached_path(&self, repo_id: &str, filename: &str) -> Option<PathBuf> {
        hf_hub::Cache::new(self.cache_dir.clone())
            .model(repo_id.to_owned())
            .get(filename)
    }
}

/// Build an inference-only ONNX Runtime session.
///
/// # Errors
///
/// Returns [`MoodError::Model`] if the model cannot be loaded.
pub(crate) fn build_session(path: &Path, intra_threads: usize) -> Result<Session> {
    info!("loading ONNX model: {}", path.display());
    Session::builder()
        .and_then(|b| Ok(b.with_intra_threads(intra_threads.max(1))?))
        .and_then(|mut b| b.commit_from_file(path))
        .map_err(|e| MoodError::Model(format!("failed to load {}: {e}", path.display())))
}

/// Load a `tokenizer.json`.
///
/// # Errors
///
/// Returns [`MoodError::Model`] if the file cannot be parsed.
pub(crate) fn load_tokenizer(path: &Path) -> Result<tokenizers::Tokenizer> {
    info!("loading tokenizer: {}", path.display());
    tokenizers::Tokenizer::from_file(path)
        .map_err(|e| MoodError::Model(format!("failed to load tokenizer {}: {e}", path.display())))
}
