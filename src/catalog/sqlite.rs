//! SQLite-backed song catalog.
//!
//! Rows live in a single table (default `songs`) with the embedding stored
//! as a JSON array in a TEXT column. Rows are returned in insertion order.

use super::{Catalog, CatalogSource, RawSong, Song};
use crate::error::{MoodError, Result};
use rusqlite::{Connection, OpenFlags, params};
use std::path::PathBuf;
use tracing::info;

/// A catalog table in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteCatalogSource {
    path: PathBuf,
    table: String,
}

impl SqliteCatalogSource {
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] if `table` is not a plain SQL identifier.
    pub fn new(path: impl Into<PathBuf>, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            path: path.into(),
            table: table.to_owned(),
        })
    }

    /// Create the table if needed and append `songs` in one transaction.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::CatalogLoad`] if the database cannot be written.
    pub fn write_songs(&self, songs: &[Song]) -> Result<usize> {
        let mut conn = Connection::open(&self.path).map_err(|e| self.db_error("open", e))?;
        conn.execute_batch(&create_table_sql(&self.table))
            .map_err(|e| self.db_error("create table", e))?;

        let tx = conn
            .transaction()
            .map_err(|e| self.db_error("begin transaction", e))?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} (track_name, artist_name, uri, emotion, intensity, \
                     keyword_embedding) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    self.table
                ))
                .map_err(|e| self.db_error("prepare insert", e))?;
            for song in songs {
                let embedding = serde_json::to_string(&song.keyword_embedding).map_err(|e| {
                    MoodError::CatalogLoad(format!("failed to encode embedding: {e}"))
                })?;
                stmt.execute(params![
                    song.track_name,
                    song.artist_name,
                    song.uri,
                    song.emotion.number(),
                    song.intensity.as_str(),
                    embedding,
                ])
                .map_err(|e| self.db_error("insert", e))?;
            }
        }
        tx.commit().map_err(|e| self.db_error("commit", e))?;

        info!(
            "wrote {} songs to {}:{}",
            songs.len(),
            self.path.display(),
            self.table
        );
        Ok(songs.len())
    }

    fn db_error(&self, op: &str, e: rusqlite::Error) -> MoodError {
        MoodError::CatalogLoad(format!("{op} failed on {}: {e}", self.path.display()))
    }
}

impl CatalogSource for SqliteCatalogSource {
    fn load(&self) -> Result<Catalog> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| self.db_error("open", e))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT track_name, artist_name, uri, emotion, intensity, keyword_embedding \
                 FROM {} ORDER BY rowid",
                self.table
            ))
            .map_err(|e| self.db_error("prepare select", e))?;
        let rows = stmt
            .query_map([], row_to_raw)
            .map_err(|e| self.db_error("query", e))?;

        let mut songs = Vec::new();
        for (i, row) in rows.enumerate() {
            let raw = row.map_err(|e| self.db_error("read row", e))?;
            songs.push(
                raw.into_song()
                    .map_err(|e| MoodError::CatalogLoad(format!("row {i}: {e}")))?,
            );
        }
        Catalog::new(songs)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}:{}", self.path.display(), self.table)
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSong> {
    Ok(RawSong {
        track_name: row.get(0)?,
        artist_name: row.get(1)?,
        uri: row.get(2)?,
        emotion: row.get(3)?,
        intensity: row.get(4)?,
        keyword_embedding: row.get(5)?,
    })
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            track_name        TEXT NOT NULL,
            artist_name       TEXT NOT NULL,
            uri               TEXT NOT NULL,
            emotion           INTEGER NOT NULL,
            intensity         TEXT NOT NULL,
            keyword_embedding TEXT NOT NULL
        );"
    )
}

/// Table names are interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is allowed.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MoodError::Config(format!("invalid catalog table name: {table:?}")))
    }
}
