//! Recommendation pipeline orchestrator.
//!
//! ```text
//! diary ─► split_sentences ─► predict (per sentence) ─► aggregate ─► classify
//!                                                                      │
//!        catalog.load ─► retrieve(class) ─► rank(keywords(diary)) ◄────┘
//!                                                │
//!                                                ▼
//!                              comment + top-K songs ─► RecommendationResult
//! ```
//!
//! Every stage runs synchronously on the calling thread; the first failure
//! aborts the request. [`Recommender::recommend_async`] moves the whole pass
//! onto a blocking worker with a deadline and a concurrency limit.

use crate::catalog::{CatalogSource, retrieve};
use crate::comment::comment_for;
use crate::config::{MoodConfig, RankingConfig};
use crate::embedding::TextEmbedder;
use crate::emotion::{
    EmotionClass, EmotionPredictor, IntensityBands, NormalizedEmotion, SentenceEmotion, aggregate,
    classify,
};
use crate::error::{MoodError, Result};
use crate::keywords::{KeywordExtractor, StopWords};
use crate::ranking::{query_vector, rank};
use crate::segment::split_sentences;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub emotion_analysis: EmotionAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub recommended_songs: Vec<RecommendedSong>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub normalized_emotion: NormalizedEmotion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedSong {
    pub track_name: String,
    pub artist_name: String,
    pub uri: String,
}

/// One sentence and its predicted emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceReport {
    pub sentence: String,
    #[serde(flatten)]
    pub emotion: SentenceEmotion,
}

/// Emotion analysis of a diary without song retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReport {
    pub sentences: Vec<SentenceReport>,
    pub normalized_emotion: NormalizedEmotion,
    pub class: EmotionClass,
}

// ---------------------------------------------------------------------------
// Recommender
// ---------------------------------------------------------------------------

/// Shared, immutable recommendation context.
///
/// Build once at startup and share behind an `Arc`.
pub struct Recommender {
    predictor: Arc<dyn EmotionPredictor>,
    embedder: Arc<dyn TextEmbedder>,
    catalog: Arc<dyn CatalogSource>,
    keywords: KeywordExtractor,
    bands: IntensityBands,
    ranking: RankingConfig,
    request_timeout_ms: u64,
    inference_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("mode", &self.predictor.mode())
            .field("catalog", &self.catalog.describe())
            .field("bands", &self.bands)
            .field("ranking", &self.ranking)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl Recommender {
    /// Assemble a recommender from loaded components.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] if `config` fails validation.
    pub fn new(
        predictor: Arc<dyn EmotionPredictor>,
        embedder: Arc<dyn TextEmbedder>,
        catalog: Arc<dyn CatalogSource>,
        stopwords: Arc<StopWords>,
        config: &MoodConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            predictor,
            embedder,
            catalog,
            keywords: KeywordExtractor::new(&config.keywords, stopwords)?,
            bands: IntensityBands::from_config(&config.intensity)?,
            ranking: config.ranking.clone(),
            request_timeout_ms: config.runtime.request_timeout_ms,
            inference_permits: Arc::new(Semaphore::new(config.runtime.max_concurrent_inference)),
        })
    }

    /// Analyze and recommend songs for a diary entry.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; an empty candidate set is not an error.
    pub fn recommend(&self, text: &str) -> Result<RecommendationResult> {
        self.recommend_with_cancel(text, &CancellationToken::new())
    }

    /// Like [`recommend`](Self::recommend), checking `cancel` between stages
    /// and between sentences.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Cancelled`] once `cancel` fires, otherwise the
    /// first stage failure.
    pub fn recommend_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<RecommendationResult> {
        let started = Instant::now();
        let report = self.analyze_with_cancel(text, cancel)?;
        let class = report.class;

        check(cancel)?;
        let catalog = self.catalog.load()?;
        let candidates = retrieve(&catalog, &class);
        debug!(
            "retrieved {} of {} songs for quadrant {} / {}",
            candidates.len(),
            catalog.len(),
            class.quadrant,
            class.intensity
        );

        let ranked = if candidates.is_empty() {
            Vec::new()
        } else {
            check(cancel)?;
            let keywords = self.keywords.extract(text, self.embedder.as_ref())?;
            let vectors: Vec<Vec<f32>> = keywords.into_iter().map(|k| k.embedding).collect();
            let query = query_vector(&vectors);
            check(cancel)?;
            rank(
                &candidates,
                query.as_deref(),
                self.ranking.dimension_policy,
                self.ranking.top_k,
            )?
        };

        check(cancel)?;
        let result = RecommendationResult {
            emotion_analysis: EmotionAnalysis {
                normalized_emotion: report.normalized_emotion,
            },
            comment: Some(comment_for(class.quadrant, class.intensity).to_owned()),
            recommended_songs: ranked
                .iter()
                .map(|r| RecommendedSong {
                    track_name: r.song.track_name.clone(),
                    artist_name: r.song.artist_name.clone(),
                    uri: r.song.uri.clone(),
                })
                .collect(),
        };

        info!(
            "recommendation: x={:.2} y={:.2} quadrant={} intensity={} candidates={} returned={} ({} ms)",
            report.normalized_emotion.x,
            report.normalized_emotion.y,
            class.quadrant,
            class.intensity,
            candidates.len(),
            result.recommended_songs.len(),
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Per-sentence emotions, their aggregate, and its classification.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::EmptyInput`] for a blank diary, or the first
    /// prediction failure.
    pub fn analyze(&self, text: &str) -> Result<EmotionReport> {
        self.analyze_with_cancel(text, &CancellationToken::new())
    }

    fn analyze_with_cancel(&self, text: &str, cancel: &CancellationToken) -> Result<EmotionReport> {
        check(cancel)?;
        let sentences = split_sentences(text)?;

        let mut reports = Vec::with_capacity(sentences.len());
        for sentence in sentences {
            check(cancel)?;
            let emotion = self.predictor.predict(&sentence)?;
            debug!(
                "sentence {:?}: valence={} arousal={}",
                sentence,
                emotion.valence.value(),
                emotion.arousal.value()
            );
            reports.push(SentenceReport { sentence, emotion });
        }

        let emotions: Vec<SentenceEmotion> = reports.iter().map(|r| r.emotion).collect();
        let normalized_emotion = aggregate(&emotions)?;
        let class = classify(&normalized_emotion, &self.bands);
        Ok(EmotionReport {
            sentences: reports,
            normalized_emotion,
            class,
        })
    }

    /// Run [`recommend_with_cancel`](Self::recommend_with_cancel) on a
    /// blocking worker.
    ///
    /// Waits for an inference permit first, and the whole request including
    /// that wait is bounded by `runtime.request_timeout_ms`. On timeout the
    /// worker is told to stop at its next checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Timeout`] past the deadline,
    /// [`MoodError::Cancelled`] if `cancel` fires, or any stage failure.
    pub async fn recommend_async(
        self: &Arc<Self>,
        text: String,
        cancel: CancellationToken,
    ) -> Result<RecommendationResult> {
        let request = cancel.child_token();
        let this = Arc::clone(self);
        let worker_token = request.clone();

        let work = async move {
            let permit = tokio::select! {
                permit = Arc::clone(&this.inference_permits).acquire_owned() => {
                    permit.map_err(|_| MoodError::Cancelled)?
                }
                () = worker_token.cancelled() => return Err(MoodError::Cancelled),
            };
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                this.recommend_with_cancel(&text, &worker_token)
            })
            .await
            .map_err(|e| MoodError::Inference(format!("inference worker failed: {e}")))?
        };

        if self.request_timeout_ms == 0 {
            return work.await;
        }

        let limit = Duration::from_millis(self.request_timeout_ms);
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                request.cancel();
                warn!("recommendation timed out after {} ms", self.request_timeout_ms);
                Err(MoodError::Timeout(self.request_timeout_ms))
            }
        }
    }
}

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(MoodError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::catalog::{Catalog, KeywordEmbedding, Song};
    use crate::config::PredictionMode;
    use crate::emotion::{Intensity, Polarity, Quadrant};
    use std::sync::Mutex;

    /// Returns a fixed sequence of predictions, then neutral.
    struct Scripted {
        queue: Mutex<Vec<SentenceEmotion>>,
    }

    impl EmotionPredictor for Scripted {
        fn predict(&self, _sentence: &str) -> Result<SentenceEmotion> {
            let mut q = self.queue.lock().unwrap();
            Ok(if q.is_empty() {
                SentenceEmotion::new(Polarity::Neutral, Polarity::Neutral)
            } else {
                q.remove(0)
            })
        }

        fn mode(&self) -> PredictionMode {
            PredictionMode::Classification
        }
    }

    struct Constant;

    impl TextEmbedder for Constant {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn recommender(script: Vec<SentenceEmotion>, songs: Vec<Song>) -> Recommender {
        Recommender::new(
            Arc::new(Scripted {
                queue: Mutex::new(script),
            }),
            Arc::new(Constant),
            Arc::new(Catalog::new(songs).unwrap()),
            Arc::new(StopWords::empty()),
            &MoodConfig::default(),
        )
        .unwrap()
    }

    fn song(name: &str, emotion: Quadrant, intensity: Intensity) -> Song {
        Song {
            track_name: name.into(),
            artist_name: "artist".into(),
            uri: format!("spotify:track:{name}"),
            emotion,
            intensity,
            keyword_embedding: KeywordEmbedding::Single(vec![1.0, 0.0]),
        }
    }

    fn e(v: Polarity, a: Polarity) -> SentenceEmotion {
        SentenceEmotion::new(v, a)
    }

    #[test]
    fn analyze_reports_each_sentence() {
        let r = recommender(
            vec![
                e(Polarity::Positive, Polarity::Positive),
                e(Polarity::Negative, Polarity::Neutral),
            ],
            Vec::new(),
        );
        let report = r.analyze("오늘은 즐거웠다. 그런데 조금 아팠다.").unwrap();
        assert_eq!(report.sentences.len(), 2);
        assert_eq!(report.sentences[0].sentence, "오늘은 즐거웠다.");
        assert_eq!(report.normalized_emotion, NormalizedEmotion::new(0.0, 0.5));
        assert_eq!(report.class.quadrant, Quadrant::First);
        assert_eq!(report.class.intensity, Intensity::Medium);
    }

    #[test]
    fn result_serializes_to_wire_shape() {
        let r = recommender(
            vec![e(Polarity::Positive, Polarity::Positive)],
            vec![song("a", Quadrant::First, Intensity::High)],
        );
        let result = r.recommend("정말 좋았다.").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["emotion_analysis"]["normalized_emotion"]["x"], 1.0);
        assert_eq!(json["emotion_analysis"]["normalized_emotion"]["y"], 1.0);
        assert!(json["comment"].is_string());
        assert_eq!(json["recommended_songs"][0]["track_name"], "a");
        assert_eq!(json["recommended_songs"][0]["uri"], "spotify:track:a");
        assert!(json["recommended_songs"][0].get("emotion").is_none());
    }

    #[test]
    fn top_k_from_config() {
        let songs: Vec<Song> = (0..25)
            .map(|i| song(&format!("s{i}"), Quadrant::First, Intensity::High))
            .collect();
        let r = recommender(vec![e(Polarity::Positive, Polarity::Positive)], songs);
        let result = r.recommend("정말 좋았다.").unwrap();
        assert_eq!(result.recommended_songs.len(), 20);
        assert_eq!(result.recommended_songs[0].track_name, "s0");
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = MoodConfig::default();
        config.ranking.top_k = 0;
        let err = Recommender::new(
            Arc::new(Scripted {
                queue: Mutex::new(Vec::new()),
            }),
            Arc::new(Constant),
            Arc::new(Catalog::default()),
            Arc::new(StopWords::empty()),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, MoodError::Config(_)));
    }

    #[test]
    fn cancelled_token_stops_before_prediction() {
        let r = recommender(Vec::new(), Vec::new());
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            r.recommend_with_cancel("좋았다.", &token),
            Err(MoodError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn async_entry_point_matches_sync() {
        let r = Arc::new(recommender(
            vec![e(Polarity::Negative, Polarity::Negative)],
            vec![song("rain", Quadrant::Third, Intensity::High)],
        ));
        let result = r
            .recommend_async("피곤했다.".to_owned(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.recommended_songs.len(), 1);
        assert_eq!(result.recommended_songs[0].track_name, "rain");
    }
}
