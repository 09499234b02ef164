//! Emotion model: per-sentence valence/arousal, paragraph aggregation, and
//! the quadrant/intensity classification used to pick songs.
//!
//! ```text
//! sentences → EmotionPredictor → SentenceEmotion* → aggregate → NormalizedEmotion
//!                                                               ↓
//!                                                    classify → (Quadrant, Intensity)
//! ```

pub mod classify;
pub mod predictor;

pub use classify::{
    EmotionClass, Intensity, IntensityBands, NEUTRAL_THRESHOLD, Quadrant, classify, quadrant,
};
pub use predictor::{EmotionPredictor, OnnxEmotionPredictor};

use crate::error::{MoodError, Result};
use serde::{Deserialize, Serialize};

/// One axis of a sentence's emotion: -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Polarity {
    Negative,
    Neutral,
    Positive,
}

impl Polarity {
    /// Numeric value on the axis.
    pub fn value(self) -> i8 {
        match self {
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
        }
    }

    /// Map a 3-way class index (0, 1, 2) onto (-1, 0, 1).
    pub fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Negative),
            1 => Some(Self::Neutral),
            2 => Some(Self::Positive),
            _ => None,
        }
    }

    /// Round a regression score to the nearest integer (ties to even) and
    /// clamp it into the axis range. Non-finite scores yield `None`.
    pub fn from_score(score: f32) -> Option<Self> {
        if !score.is_finite() {
            return None;
        }
        let rounded = score.round_ties_even();
        Some(if rounded <= -1.0 {
            Self::Negative
        } else if rounded >= 1.0 {
            Self::Positive
        } else {
            Self::Neutral
        })
    }
}

impl From<Polarity> for i8 {
    fn from(p: Polarity) -> Self {
        p.value()
    }
}

impl TryFrom<i8> for Polarity {
    type Error = String;

    fn try_from(v: i8) -> std::result::Result<Self, Self::Error> {
        match v {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Positive),
            other => Err(format!("polarity out of range: {other}")),
        }
    }
}

/// Predicted emotion of a single sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceEmotion {
    pub valence: Polarity,
    pub arousal: Polarity,
}

impl SentenceEmotion {
    pub fn new(valence: Polarity, arousal: Polarity) -> Self {
        Self { valence, arousal }
    }
}

/// Mean emotion of a paragraph, each axis rounded to two decimals.
///
/// `x` is valence, `y` is arousal; both lie in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEmotion {
    pub x: f64,
    pub y: f64,
}

impl NormalizedEmotion {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from the neutral origin.
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Average sentence emotions into one paragraph-level point.
///
/// Unweighted arithmetic mean per axis, rounded to two decimal places.
///
/// # Errors
///
/// Returns [`MoodError::EmptyInput`] when `sentences` is empty.
pub fn aggregate(sentences: &[SentenceEmotion]) -> Result<NormalizedEmotion> {
    if sentences.is_empty() {
        return Err(MoodError::EmptyInput(
            "cannot aggregate zero sentence emotions".to_owned(),
        ));
    }

    let n = sentences.len() as f64;
    let (sum_x, sum_y) = sentences.iter().fold((0i64, 0i64), |(x, y), s| {
        (x + i64::from(s.valence.value()), y + i64::from(s.arousal.value()))
    });

    Ok(NormalizedEmotion {
        x: round2(sum_x as f64 / n),
        y: round2(sum_y as f64 / n),
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}
