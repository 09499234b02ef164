//! Similarity ranking of candidate songs against the diary's keywords.

use crate::catalog::{KeywordEmbedding, Song};
use crate::config::DimensionPolicy;
use crate::embedding::{cosine_similarity, mean_vector};
use crate::error::{MoodError, Result};
use tracing::warn;

/// A candidate with its similarity to the diary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSong<'a> {
    pub song: &'a Song,
    pub similarity: f32,
}

/// Mean of the keyword vectors, or `None` if there are none.
pub fn query_vector(keyword_vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    mean_vector(keyword_vectors)
}

/// Cosine similarity between the query and a song's keyword embedding.
///
/// Multi-vector embeddings are averaged first. With
/// [`DimensionPolicy::Truncate`] both vectors are cut to the shorter length.
///
/// # Errors
///
/// Returns [`MoodError::DimensionMismatch`] under [`DimensionPolicy::Strict`]
/// when the dimensions differ, or [`MoodError::CatalogLoad`] if the song's
/// embedding cannot be reduced to a single vector.
pub fn similarity(query: &[f32], song: &KeywordEmbedding, policy: DimensionPolicy) -> Result<f32> {
    score(query, song, policy).map(|(similarity, _)| similarity)
}

/// Similarity plus the song's dimension when it had to be truncated.
fn score(
    query: &[f32],
    song: &KeywordEmbedding,
    policy: DimensionPolicy,
) -> Result<(f32, Option<usize>)> {
    let song_vec = song
        .representative()
        .ok_or_else(|| MoodError::CatalogLoad("song embedding is empty or ragged".to_owned()))?;

    let truncated = (query.len() != song_vec.len()).then_some(song_vec.len());
    if let (Some(song_dim), DimensionPolicy::Strict) = (truncated, policy) {
        return Err(MoodError::DimensionMismatch {
            input: query.len(),
            song: song_dim,
        });
    }
    Ok((cosine_similarity(query, &song_vec), truncated))
}

/// Rank candidates by similarity, best first, and keep `top_k`.
///
/// The sort is stable, so equal scores keep catalog order. Without a query
/// vector every candidate scores 0.0 and the catalog order is returned.
/// Dimension truncation is reported once per call, not once per song.
///
/// # Errors
///
/// Propagates errors from [`similarity`].
pub fn rank<'a>(
    candidates: &[&'a Song],
    query: Option<&[f32]>,
    policy: DimensionPolicy,
    top_k: usize,
) -> Result<Vec<RankedSong<'a>>> {
    let mut truncated = 0usize;
    let mut first_song_dim = None;

    let mut ranked = Vec::with_capacity(candidates.len());
    for &song in candidates {
        let similarity = match query {
            Some(q) => {
                let (similarity, song_dim) = score(q, &song.keyword_embedding, policy)?;
                if let Some(dim) = song_dim {
                    truncated += 1;
                    first_song_dim.get_or_insert(dim);
                }
                similarity
            }
            None => 0.0,
        };
        ranked.push(RankedSong { song, similarity });
    }

    if let (Some(q), Some(song_dim)) = (query, first_song_dim) {
        warn!(
            "embedding dimensions differ for {truncated} of {} songs (input={}, song={song_dim}), truncating",
            candidates.len(),
            q.len()
        );
    }

    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    ranked.truncate(top_k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::emotion::{Intensity, Quadrant};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts WARN events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn song(name: &str, embedding: KeywordEmbedding) -> Song {
        Song {
            track_name: name.into(),
            artist_name: String::new(),
            uri: String::new(),
            emotion: Quadrant::First,
            intensity: Intensity::High,
            keyword_embedding: embedding,
        }
    }

    fn names(ranked: &[RankedSong<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.song.track_name.clone()).collect()
    }

    #[test]
    fn query_vector_is_mean() {
        assert_eq!(
            query_vector(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap(),
            vec![0.5, 0.5]
        );
        assert!(query_vector(&[]).is_none());
    }

    #[test]
    fn similarity_averages_multi_vector_song() {
        let e = KeywordEmbedding::Multi(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let s = similarity(&[1.0, 1.0], &e, DimensionPolicy::Strict).unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn truncate_policy_compares_shared_prefix() {
        let e = KeywordEmbedding::Single(vec![1.0, 0.0, 5.0]);
        let s = similarity(&[1.0, 0.0], &e, DimensionPolicy::Truncate).unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn strict_policy_rejects_mismatch() {
        let e = KeywordEmbedding::Single(vec![1.0, 0.0, 5.0]);
        assert!(matches!(
            similarity(&[1.0, 0.0], &e, DimensionPolicy::Strict),
            Err(MoodError::DimensionMismatch { input: 2, song: 3 })
        ));
    }

    #[test]
    fn ranks_descending_with_stable_ties() {
        let songs = [
            song("orthogonal", KeywordEmbedding::Single(vec![0.0, 1.0])),
            song("same-a", KeywordEmbedding::Single(vec![1.0, 0.0])),
            song("close", KeywordEmbedding::Single(vec![1.0, 0.5])),
            song("same-b", KeywordEmbedding::Single(vec![2.0, 0.0])),
        ];
        let refs: Vec<&Song> = songs.iter().collect();
        let ranked = rank(&refs, Some(&[1.0, 0.0]), DimensionPolicy::Strict, 20).unwrap();
        assert_eq!(names(&ranked), vec!["same-a", "same-b", "close", "orthogonal"]);
        assert!(ranked.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn keeps_top_k() {
        let songs: Vec<Song> = (0..30)
            .map(|i| song(&format!("s{i}"), KeywordEmbedding::Single(vec![1.0, i as f32])))
            .collect();
        let refs: Vec<&Song> = songs.iter().collect();
        let ranked = rank(&refs, Some(&[1.0, 0.0]), DimensionPolicy::Strict, 20).unwrap();
        assert_eq!(ranked.len(), 20);
        assert_eq!(ranked[0].song.track_name, "s0");
    }

    #[test]
    fn no_query_keeps_catalog_order() {
        let songs = [
            song("first", KeywordEmbedding::Single(vec![0.0, 1.0])),
            song("second", KeywordEmbedding::Single(vec![1.0, 0.0])),
        ];
        let refs: Vec<&Song> = songs.iter().collect();
        let ranked = rank(&refs, None, DimensionPolicy::Strict, 20).unwrap();
        assert_eq!(names(&ranked), vec!["first", "second"]);
        assert!(ranked.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn empty_candidates_rank_to_empty() {
        assert!(
            rank(&[], Some(&[1.0]), DimensionPolicy::Truncate, 20)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn truncation_warns_once_per_ranking() {
        let songs: Vec<Song> = (0..5)
            .map(|i| song(&format!("s{i}"), KeywordEmbedding::Single(vec![1.0, i as f32, 9.0])))
            .collect();
        let refs: Vec<&Song> = songs.iter().collect();

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        let ranked = tracing::subscriber::with_default(subscriber, || {
            rank(&refs, Some(&[1.0, 0.0]), DimensionPolicy::Truncate, 20).unwrap()
        });

        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].song.track_name, "s0");
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn matching_dimensions_do_not_warn() {
        let songs = [song("a", KeywordEmbedding::Single(vec![1.0, 0.0]))];
        let refs: Vec<&Song> = songs.iter().collect();

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        tracing::subscriber::with_default(subscriber, || {
            rank(&refs, Some(&[1.0, 0.0]), DimensionPolicy::Truncate, 20).unwrap()
        });
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }
}
