//! Song catalog: rows, sources, and emotion-based retrieval.
//!
//! A [`Catalog`] is loaded by value from a [`CatalogSource`] at the start of
//! every recommendation and is never mutated afterwards. Rows keep the order
//! the source returned them in; ranking ties fall back to that order.

pub mod delimited;
pub mod retrieve;
pub mod sqlite;

pub use delimited::CsvCatalogSource;
pub use retrieve::retrieve;
pub use sqlite::SqliteCatalogSource;

use crate::config::{CatalogConfig, CatalogKind};
use crate::embedding::mean_vector;
use crate::emotion::{Intensity, Quadrant};
use crate::error::{MoodError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Precomputed keyword embedding of a song: one vector, or one per keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordEmbedding {
    Single(Vec<f32>),
    Multi(Vec<Vec<f32>>),
}

impl KeywordEmbedding {
    /// The vector compared against the diary: the mean for multi-vector rows.
    ///
    /// Returns `None` for an empty or ragged multi-vector embedding.
    pub fn representative(&self) -> Option<Cow<'_, [f32]>> {
        match self {
            Self::Single(v) => Some(Cow::Borrowed(v.as_slice())),
            Self::Multi(vs) => mean_vector(vs).map(Cow::Owned),
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        match self {
            Self::Single(v) if v.is_empty() => Err("empty keyword embedding".to_owned()),
            Self::Multi(vs) if vs.is_empty() => Err("empty keyword embedding list".to_owned()),
            Self::Multi(vs) => {
                let dim = vs[0].len();
                if dim == 0 || vs.iter().any(|v| v.len() != dim) {
                    Err("keyword embedding vectors differ in length".to_owned())
                } else {
                    Ok(())
                }
            }
            Self::Single(_) => Ok(()),
        }
    }
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub track_name: String,
    pub artist_name: String,
    pub uri: String,
    pub emotion: Quadrant,
    pub intensity: Intensity,
    #[serde(deserialize_with = "embedding_field")]
    pub keyword_embedding: KeywordEmbedding,
}

/// Catalog exports often store the embedding as a JSON-encoded string.
fn embedding_field<'de, D>(deserializer: D) -> std::result::Result<KeywordEmbedding, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Inline(KeywordEmbedding),
        Encoded(String),
    }

    match Field::deserialize(deserializer)? {
        Field::Inline(e) => Ok(e),
        Field::Encoded(s) => parse_embedding(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a JSON array (flat or nested) into a keyword embedding.
pub(crate) fn parse_embedding(s: &str) -> std::result::Result<KeywordEmbedding, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid keyword_embedding: {e}"))
}

/// A flat catalog row as stored in tables and CSV files: the quadrant as a
/// number, the intensity as its label, the embedding as JSON text.
#[derive(Debug, Deserialize)]
struct RawSong {
    track_name: String,
    artist_name: String,
    uri: String,
    emotion: i64,
    intensity: String,
    keyword_embedding: String,
}

impl RawSong {
    fn into_song(self) -> std::result::Result<Song, String> {
        let emotion = u8::try_from(self.emotion)
            .map_err(|_| format!("quadrant must be 1-4, got {}", self.emotion))
            .and_then(Quadrant::try_from)?;
        let intensity: Intensity = self.intensity.trim().parse()?;
        Ok(Song {
            track_name: self.track_name,
            artist_name: self.artist_name,
            uri: self.uri,
            emotion,
            intensity,
            keyword_embedding: parse_embedding(&self.keyword_embedding)?,
        })
    }
}

/// An ordered, validated set of songs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    songs: Vec<Song>,
}

impl Catalog {
    /// Wrap songs, rejecting rows whose embedding cannot be reduced to one vector.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::CatalogLoad`] naming the first invalid row.
    pub fn new(songs: Vec<Song>) -> Result<Self> {
        for (i, song) in songs.iter().enumerate() {
            song.keyword_embedding.check().map_err(|e| {
                MoodError::CatalogLoad(format!("row {i} ({}): {e}", song.track_name))
            })?;
        }
        Ok(Self { songs })
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn into_songs(self) -> Vec<Song> {
        self.songs
    }
}

/// Where the catalog comes from.
///
/// `load` runs once per request and returns an independent copy.
pub trait CatalogSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`MoodError::CatalogLoad`] if the source is unreachable or malformed.
    fn load(&self) -> Result<Catalog>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

impl CatalogSource for Catalog {
    fn load(&self) -> Result<Catalog> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} songs)", self.songs.len())
    }
}

/// A JSON file holding an array of songs.
#[derive(Debug, Clone)]
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load(&self) -> Result<Catalog> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            MoodError::CatalogLoad(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let songs: Vec<Song> = serde_json::from_str(&content).map_err(|e| {
            MoodError::CatalogLoad(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Catalog::new(songs)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Build the catalog source named by the configuration.
///
/// # Errors
///
/// Returns [`MoodError::Config`] if the SQLite table name is not a plain identifier.
pub fn source_from_config(config: &CatalogConfig) -> Result<Arc<dyn CatalogSource>> {
    let source: Arc<dyn CatalogSource> = match config.kind {
        CatalogKind::Sqlite => Arc::new(SqliteCatalogSource::new(&config.path, &config.table)?),
        CatalogKind::Json => Arc::new(JsonCatalogSource::new(&config.path)),
        CatalogKind::Csv => Arc::new(CsvCatalogSource::new(&config.path)),
    };
    info!("catalog source: {}", source.describe());
    Ok(source)
}
