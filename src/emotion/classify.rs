//! Quadrant and intensity classification of a normalized emotion.

use super::NormalizedEmotion;
use crate::config::IntensityConfig;
use crate::error::{MoodError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default for `intensity.low`, the distance below which an emotion is
/// neutral.
///
/// Quadrant filtering follows the configured `intensity.low` through
/// [`EmotionClass::filters_by_quadrant`], not this constant. A distance
/// equal to the threshold is low intensity and is quadrant-filtered.
pub const NEUTRAL_THRESHOLD: f64 = 0.2;

/// Region of the valence/arousal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quadrant {
    /// Pleasant and activated (joy, excitement).
    First,
    /// Unpleasant and activated (anger, stress).
    Second,
    /// Unpleasant and deactivated (sadness, fatigue).
    Third,
    /// Pleasant and deactivated (calm, relief).
    Fourth,
}

impl Quadrant {
    /// Quadrant number, 1 to 4.
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
        }
    }
}

impl From<Quadrant> for u8 {
    fn from(q: Quadrant) -> Self {
        q.number()
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            4 => Ok(Self::Fourth),
            other => Err(format!("quadrant must be 1-4, got {other}")),
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Quadrant of a point. The origin and the non-negative x axis fall in
/// the first quadrant; the negative y axis with x ≥ 0 falls in the fourth.
pub fn quadrant(x: f64, y: f64) -> Quadrant {
    if x >= 0.0 && y >= 0.0 {
        Quadrant::First
    } else if x < 0.0 && y > 0.0 {
        Quadrant::Second
    } else if x < 0.0 && y <= 0.0 {
        Quadrant::Third
    } else {
        Quadrant::Fourth
    }
}

/// Intensity band, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Neutral,
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown intensity label: {other:?}")),
        }
    }
}

/// Ascending distance thresholds separating the four intensity bands.
///
/// Bands are closed below: a distance equal to a threshold belongs to the
/// stronger band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityBands {
    low: f64,
    medium: f64,
    high: f64,
}

impl Default for IntensityBands {
    fn default() -> Self {
        Self {
            low: NEUTRAL_THRESHOLD,
            medium: 0.5,
            high: 0.8,
        }
    }
}

impl IntensityBands {
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] unless `0 < low < medium < high`.
    pub fn new(low: f64, medium: f64, high: f64) -> Result<Self> {
        if !(low > 0.0 && low < medium && medium < high) {
            return Err(MoodError::Config(format!(
                "intensity thresholds must be positive and strictly ascending, got {low}/{medium}/{high}"
            )));
        }
        Ok(Self { low, medium, high })
    }

    /// # Errors
    ///
    /// See [`IntensityBands::new`].
    pub fn from_config(config: &IntensityConfig) -> Result<Self> {
        Self::new(config.low, config.medium, config.high)
    }

    /// Band for a distance from the origin.
    pub fn intensity(&self, distance: f64) -> Intensity {
        if distance < self.low {
            Intensity::Neutral
        } else if distance < self.medium {
            Intensity::Low
        } else if distance < self.high {
            Intensity::Medium
        } else {
            Intensity::High
        }
    }
}

/// Classification of a paragraph's emotion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionClass {
    pub quadrant: Quadrant,
    pub intensity: Intensity,
    pub distance: f64,
}

impl EmotionClass {
    /// Whether catalog retrieval should narrow candidates to this quadrant.
    pub fn filters_by_quadrant(&self) -> bool {
        self.intensity != Intensity::Neutral
    }
}

/// Classify a normalized emotion into quadrant and intensity.
pub fn classify(emotion: &NormalizedEmotion, bands: &IntensityBands) -> EmotionClass {
    let distance = emotion.distance();
    EmotionClass {
        quadrant: quadrant(emotion.x, emotion.y),
        intensity: bands.intensity(distance),
        distance,
    }
}
