//! Startup initialization: resolves and eagerly loads every model, the
//! stop-word list and the catalog source, so the first request does not
//! pay for downloads.
//!
//! Call [`build_recommender`] once and share the result behind an `Arc`.

use crate::catalog::{CatalogSource, source_from_config};
use crate::config::{KeywordConfig, MoodConfig};
use crate::embedding::{EmbeddingEngine, TextEmbedder};
use crate::emotion::{EmotionPredictor, OnnxEmotionPredictor};
use crate::error::Result;
use crate::keywords::StopWords;
use crate::models::ModelResolver;
use crate::pipeline::Recommender;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Pre-loaded models ready for the pipeline.
pub struct InitializedModels {
    /// Sentence emotion predictor for the configured strategy.
    pub predictor: Arc<dyn EmotionPredictor>,
    /// Sentence embedding model used for keywords.
    pub embedder: Arc<dyn TextEmbedder>,
}

/// Resolve (downloading if needed) and load the emotion and embedding models.
///
/// # Errors
///
/// Returns an error if any model cannot be resolved or loaded.
pub fn initialize_models(config: &MoodConfig) -> Result<InitializedModels> {
    let resolver = ModelResolver::new(&config.models)?;

    let start = Instant::now();
    let predictor = OnnxEmotionPredictor::load(&config.predictor, &resolver)?;
    info!(
        "emotion models loaded in {:.1}s",
        start.elapsed().as_secs_f64()
    );

    let start = Instant::now();
    let embedder = EmbeddingEngine::load(&config.embedding, &resolver)?;
    info!(
        "embedding model loaded in {:.1}s",
        start.elapsed().as_secs_f64()
    );

    Ok(InitializedModels {
        predictor: Arc::new(predictor),
        embedder: Arc::new(embedder),
    })
}

/// Load the configured stop-word list.
///
/// A configured file that does not exist is logged and treated as an empty
/// list; a file that exists but cannot be read is an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or compiled.
pub fn load_stopwords(config: &KeywordConfig) -> Result<StopWords> {
    match config.stopwords_path {
        Some(ref path) if path.exists() => StopWords::from_file(path),
        Some(ref path) => {
            warn!(
                "stop-word file {} not found, keywords will include stop words",
                path.display()
            );
            Ok(StopWords::empty())
        }
        None => Ok(StopWords::empty()),
    }
}

/// Build a ready-to-serve [`Recommender`] from configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any model, the
/// stop-word list, or the catalog source cannot be set up.
pub fn build_recommender(config: &MoodConfig) -> Result<Recommender> {
    config.validate()?;
    let catalog: Arc<dyn CatalogSource> = source_from_config(&config.catalog)?;
    let stopwords = Arc::new(load_stopwords(&config.keywords)?);
    let models = initialize_models(config)?;
    Recommender::new(
        models.predictor,
        models.embedder,
        catalog,
        stopwords,
        config,
    )
}
