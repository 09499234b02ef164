//! Moodlist: diary emotion analysis and song recommendation.
//!
//! This crate turns a free-text diary entry into a playlist:
//! Diary → Sentences → Emotion → Quadrant/Intensity → Catalog → Ranked songs
//!
//! # Architecture
//!
//! The pipeline is a single synchronous pass over independent stages:
//! - **Segmentation**: splits the diary into sentences (UAX #29 plus Korean
//!   sentence-final endings)
//! - **Emotion**: predicts valence/arousal per sentence with ONNX models via
//!   `ort`, then averages and classifies the paragraph
//! - **Catalog**: loads songs from SQLite or JSON and keeps those matching
//!   the diary's intensity and quadrant
//! - **Keywords**: extracts key phrases by sentence-embedding similarity
//! - **Ranking**: orders candidates by cosine similarity to those phrases
//! - **Comment**: picks a short message for the emotion class

pub mod catalog;
pub mod comment;
pub mod config;
pub mod embedding;
pub mod emotion;
pub mod error;
pub mod keywords;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod segment;
pub mod startup;

pub use catalog::{Catalog, CatalogSource, Song};
pub use config::MoodConfig;
pub use error::{MoodError, Result};
pub use pipeline::{RecommendationResult, Recommender};
pub use startup::build_recommender;
