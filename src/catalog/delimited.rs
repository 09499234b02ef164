//! CSV song catalog.
//!
//! The first line names the columns. `track_name`, `artist_name`, `uri`,
//! `emotion`, `intensity` and `keyword_embedding` are required; any other
//! column (a dataframe index, audio features) is ignored. The embedding
//! cell holds a JSON list, flat or nested, the way dataframe exports write
//! list columns.

use super::{Catalog, CatalogSource, RawSong};
use crate::error::{MoodError, Result};
use std::path::PathBuf;
use tracing::debug;

/// A CSV file holding one song per row.
#[derive(Debug, Clone)]
pub struct CsvCatalogSource {
    path: PathBuf,
}

impl CsvCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for CsvCatalogSource {
    fn load(&self) -> Result<Catalog> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .map_err(|e| {
                MoodError::CatalogLoad(format!("failed to open {}: {e}", self.path.display()))
            })?;

        let mut songs = Vec::new();
        for (i, row) in reader.deserialize::<RawSong>().enumerate() {
            let raw = row.map_err(|e| {
                MoodError::CatalogLoad(format!("failed to parse {}: {e}", self.path.display()))
            })?;
            songs.push(
                raw.into_song()
                    .map_err(|e| MoodError::CatalogLoad(format!("row {i}: {e}")))?,
            );
        }
        debug!("read {} songs from {}", songs.len(), self.path.display());
        Catalog::new(songs)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
