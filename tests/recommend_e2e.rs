#![allow(clippy::unwrap_used, clippy::expect_used)]

use moodlist::catalog::{Catalog, KeywordEmbedding, Song};
use moodlist::comment::{NEUTRAL_COMMENT, comment_for};
use moodlist::config::PredictionMode;
use moodlist::embedding::TextEmbedder;
use moodlist::emotion::{EmotionPredictor, Intensity, Polarity, Quadrant, SentenceEmotion};
use moodlist::keywords::StopWords;
use moodlist::{MoodConfig, MoodError, Recommender};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Predicts from marker words: 행복 → (1, 1), 힘들 → (-1, 1), 피곤 → (-1, -1).
struct MarkerPredictor;

impl EmotionPredictor for MarkerPredictor {
    fn predict(&self, sentence: &str) -> moodlist::Result<SentenceEmotion> {
        if sentence.contains("고장") {
            return Err(MoodError::Inference("model exploded".into()));
        }
        if sentence.contains("느림") {
            std::thread::sleep(Duration::from_millis(300));
        }
        let (v, a) = if sentence.contains("행복") {
            (Polarity::Positive, Polarity::Positive)
        } else if sentence.contains("힘들") {
            (Polarity::Negative, Polarity::Positive)
        } else if sentence.contains("피곤") {
            (Polarity::Negative, Polarity::Negative)
        } else {
            (Polarity::Neutral, Polarity::Neutral)
        };
        Ok(SentenceEmotion::new(v, a))
    }

    fn mode(&self) -> PredictionMode {
        PredictionMode::Classification
    }
}

const VOCAB: [&str; 4] = ["행복", "여행", "비", "커피"];

/// Bag-of-vocabulary vectors with a small bias dimension.
struct VocabEmbedder;

impl TextEmbedder for VocabEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> moodlist::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v: Vec<f32> = VOCAB.iter().map(|w| t.matches(w).count() as f32).collect();
                v.push(0.01);
                v
            })
            .collect())
    }
}

fn song(name: &str, emotion: Quadrant, intensity: Intensity, embedding: Vec<f32>) -> Song {
    Song {
        track_name: name.into(),
        artist_name: format!("{name}-artist"),
        uri: format!("spotify:track:{name}"),
        emotion,
        intensity,
        keyword_embedding: KeywordEmbedding::Single(embedding),
    }
}

fn catalog() -> Catalog {
    Catalog::new(vec![
        song("travel", Quadrant::First, Intensity::High, vec![0.0, 1.0, 0.0, 0.0, 0.0]),
        song("storm", Quadrant::Second, Intensity::High, vec![1.0, 0.0, 0.0, 0.0, 0.0]),
        song("mixed", Quadrant::First, Intensity::High, vec![0.5, 0.5, 0.0, 0.0, 0.0]),
        song("plain", Quadrant::Third, Intensity::Neutral, vec![0.0, 0.0, 1.0, 0.0, 0.0]),
        song("sunny", Quadrant::First, Intensity::High, vec![1.0, 0.0, 0.0, 0.0, 0.0]),
        song("soft", Quadrant::First, Intensity::Low, vec![1.0, 0.0, 0.0, 0.0, 0.0]),
        song("plain2", Quadrant::First, Intensity::Neutral, vec![0.0, 0.0, 0.0, 1.0, 0.0]),
    ])
    .unwrap()
}

fn recommender_with(config: &MoodConfig) -> Recommender {
    Recommender::new(
        Arc::new(MarkerPredictor),
        Arc::new(VocabEmbedder),
        Arc::new(catalog()),
        Arc::new(StopWords::empty()),
        config,
    )
    .expect("recommender")
}

fn recommender() -> Recommender {
    recommender_with(&MoodConfig::default())
}

fn names(result: &moodlist::RecommendationResult) -> Vec<&str> {
    result
        .recommended_songs
        .iter()
        .map(|s| s.track_name.as_str())
        .collect()
}

#[test]
fn happy_diary_recommends_first_quadrant_songs_by_similarity() {
    let result = recommender()
        .recommend("오늘 너무 행복했어. 정말 행복했어.")
        .unwrap();

    let e = result.emotion_analysis.normalized_emotion;
    assert_eq!((e.x, e.y), (1.0, 1.0));
    assert_eq!(
        result.comment.as_deref(),
        Some(comment_for(Quadrant::First, Intensity::High))
    );
    assert_eq!(names(&result), vec!["sunny", "mixed", "travel"]);
    assert_eq!(result.recommended_songs[0].uri, "spotify:track:sunny");
    assert_eq!(result.recommended_songs[0].artist_name, "sunny-artist");
}

#[test]
fn neutral_diary_is_not_filtered_by_quadrant() {
    let result = recommender().recommend("그냥 평범한 날이었다").unwrap();
    let e = result.emotion_analysis.normalized_emotion;
    assert_eq!((e.x, e.y), (0.0, 0.0));
    assert_eq!(result.comment.as_deref(), Some(NEUTRAL_COMMENT));

    let mut got = names(&result);
    got.sort_unstable();
    assert_eq!(got, vec!["plain", "plain2"]);
}

#[test]
fn no_matching_songs_is_an_empty_list() {
    let result = recommender().recommend("오늘은 정말 피곤했다.").unwrap();
    assert!(result.recommended_songs.is_empty());
    assert_eq!(
        result.comment.as_deref(),
        Some(comment_for(Quadrant::Third, Intensity::High))
    );
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["recommended_songs"], serde_json::json!([]));
}

#[test]
fn mixed_sentences_average_before_classifying() {
    // (1,1) and (-1,1) average to (0,1): first quadrant, high.
    let report = recommender()
        .analyze("아침엔 행복했다. 저녁엔 힘들었다.")
        .unwrap();
    assert_eq!(report.sentences.len(), 2);
    assert_eq!(report.normalized_emotion.x, 0.0);
    assert_eq!(report.normalized_emotion.y, 1.0);
    assert_eq!(report.class.quadrant, Quadrant::First);
    assert_eq!(report.class.intensity, Intensity::High);
}

#[test]
fn top_k_limits_results() {
    let mut config = MoodConfig::default();
    config.ranking.top_k = 1;
    let result = recommender_with(&config)
        .recommend("오늘 너무 행복했어.")
        .unwrap();
    assert_eq!(names(&result), vec!["sunny"]);
}

#[test]
fn predictor_failure_aborts_request() {
    let err = recommender()
        .recommend("좋은 하루였다. 고장 났다.")
        .unwrap_err();
    assert!(matches!(err, MoodError::Inference(_)));
    assert_eq!(err.code(), "inference_failed");
}

#[test]
fn blank_diary_is_empty_input() {
    let err = recommender().recommend("  \n\t ").unwrap_err();
    assert!(matches!(err, MoodError::EmptyInput(_)));
    assert!(err.is_client_error());
}

#[test]
fn cancelled_request_returns_cancelled() {
    let token = CancellationToken::new();
    token.cancel();
    let err = recommender()
        .recommend_with_cancel("오늘 너무 행복했어.", &token)
        .unwrap_err();
    assert!(matches!(err, MoodError::Cancelled));
}

#[tokio::test]
async fn async_request_times_out() {
    let mut config = MoodConfig::default();
    config.runtime.request_timeout_ms = 50;
    let r = Arc::new(recommender_with(&config));

    let err = r
        .recommend_async("느림 행복했어.".to_owned(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MoodError::Timeout(50)));
}

#[tokio::test]
async fn async_request_honours_parent_cancellation() {
    let r = Arc::new(recommender());
    let token = CancellationToken::new();
    token.cancel();
    let err = r
        .recommend_async("오늘 너무 행복했어.".to_owned(), token)
        .await
        .unwrap_err();
    assert!(matches!(err, MoodError::Cancelled));
}
