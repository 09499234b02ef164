//! Keyword extraction by embedding similarity.
//!
//! Candidate phrases are the word n-grams of the diary after stop-word
//! removal. Each candidate is embedded with the same model as the whole
//! document and scored by cosine similarity against it; the best `top_n`
//! survive. Candidate embeddings are kept on the result so the ranker can
//! reuse them without a second pass through the model.

pub mod stopwords;

pub use stopwords::StopWords;

use crate::config::KeywordConfig;
use crate::embedding::{TextEmbedder, cosine_similarity};
use crate::error::{MoodError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Tokens of two or more word characters.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// An extracted keyword phrase with its document similarity and embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub phrase: String,
    pub score: f32,
    pub embedding: Vec<f32>,
}

/// Extracts the most representative phrases of a text.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stopwords: Arc<StopWords>,
    token_re: Regex,
    top_n: usize,
    ngram_min: usize,
    ngram_max: usize,
}

impl KeywordExtractor {
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] if the n-gram range is empty or zero-based.
    pub fn new(config: &KeywordConfig, stopwords: Arc<StopWords>) -> Result<Self> {
        if config.ngram_min == 0 || config.ngram_min > config.ngram_max {
            return Err(MoodError::Config(format!(
                "invalid n-gram range {}..={}",
                config.ngram_min, config.ngram_max
            )));
        }
        let token_re = Regex::new(TOKEN_PATTERN)
            .map_err(|e| MoodError::Config(format!("invalid token pattern: {e}")))?;
        Ok(Self {
            stopwords,
            token_re,
            top_n: config.top_n,
            ngram_min: config.ngram_min,
            ngram_max: config.ngram_max,
        })
    }

    /// Candidate phrases of `text`, unique, in order of first appearance.
    ///
    /// Text is lowercased and English function words are dropped before
    /// n-grams are formed, so an n-gram may span a dropped word.
    pub fn candidates(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !stopwords::ENGLISH_STOP_WORDS.contains(t))
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for start in 0..tokens.len() {
            for n in self.ngram_min..=self.ngram_max {
                let Some(window) = tokens.get(start..start + n) else {
                    break;
                };
                let phrase = window.join(" ");
                if seen.insert(phrase.clone()) {
                    out.push(phrase);
                }
            }
        }
        out
    }

    /// Extract up to `top_n` keywords, best first.
    ///
    /// Equal scores keep first-appearance order. A text with no candidate
    /// phrases yields an empty list without touching the model.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Inference`] if embedding fails.
    pub fn extract(&self, text: &str, embedder: &dyn TextEmbedder) -> Result<Vec<Keyword>> {
        let cleaned = self.stopwords.remove(text);
        let candidates = self.candidates(&cleaned);
        if candidates.is_empty() || self.top_n == 0 {
            debug!("no keyword candidates");
            return Ok(Vec::new());
        }

        let mut inputs: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        inputs.push(cleaned.as_ref());
        inputs.extend(candidates.iter().map(String::as_str));

        let mut vectors = embedder.embed_batch(&inputs)?;
        if vectors.len() != inputs.len() {
            return Err(MoodError::Inference(format!(
                "embedder returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        let document = vectors.remove(0);

        let mut keywords: Vec<Keyword> = candidates
            .into_iter()
            .zip(vectors)
            .map(|(phrase, embedding)| Keyword {
                score: cosine_similarity(&document, &embedding),
                phrase,
                embedding,
            })
            .collect();
        keywords.sort_by(|a, b| b.score.total_cmp(&a.score));
        keywords.truncate(self.top_n);

        debug!(
            "keywords: {:?}",
            keywords.iter().map(|k| k.phrase.as_str()).collect::<Vec<_>>()
        );
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts vocabulary terms, plus a constant bias dimension.
    struct VocabEmbedder {
        calls: AtomicUsize,
    }

    const VOCAB: [&str; 3] = ["우산", "행복", "친구"];

    impl TextEmbedder for VocabEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v: Vec<f32> =
                        VOCAB.iter().map(|w| t.matches(w).count() as f32).collect();
                    v.push(0.1);
                    v
                })
                .collect())
        }
    }

    fn embedder() -> VocabEmbedder {
        VocabEmbedder {
            calls: AtomicUsize::new(0),
        }
    }

    fn extractor(top_n: usize, stopwords: StopWords) -> KeywordExtractor {
        let config = KeywordConfig {
            top_n,
            ..KeywordConfig::default()
        };
        KeywordExtractor::new(&config, Arc::new(stopwords)).expect("extractor")
    }

    #[test]
    fn candidates_are_unique_ngrams_in_order() {
        let ex = extractor(5, StopWords::empty());
        assert_eq!(
            ex.candidates("The rainy day, rainy mood"),
            vec!["rainy", "rainy day", "day", "day rainy", "rainy mood", "mood"]
        );
    }

    #[test]
    fn candidates_korean() {
        let ex = extractor(5, StopWords::empty());
        assert_eq!(
            ex.candidates("오늘 비가 왔다"),
            vec!["오늘", "오늘 비가", "비가", "비가 왔다", "왔다"]
        );
    }

    #[test]
    fn single_character_tokens_skipped() {
        let ex = extractor(5, StopWords::empty());
        assert_eq!(ex.candidates("a b 나 비가"), vec!["비가"]);
    }

    #[test]
    fn ranks_by_document_similarity() {
        let ex = extractor(2, StopWords::empty());
        let keywords = ex.extract("우산 우산 우산 친구", &embedder()).unwrap();
        let phrases: Vec<_> = keywords.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["우산 우산", "우산"]);
        assert!(keywords[0].score >= keywords[1].score);
        assert_eq!(keywords[0].embedding.len(), VOCAB.len() + 1);
    }

    #[test]
    fn stop_words_removed_before_extraction() {
        let ex = extractor(5, StopWords::from_words(["친구"]).unwrap());
        let keywords = ex.extract("우산 친구 우산", &embedder()).unwrap();
        assert!(!keywords.is_empty());
        assert!(keywords.iter().all(|k| !k.phrase.contains("친구")));
    }

    #[test]
    fn no_candidates_skips_model() {
        let ex = extractor(5, StopWords::from_words(["친구"]).unwrap());
        let e = embedder();
        assert!(ex.extract("친구 . !", &e).unwrap().is_empty());
        assert_eq!(e.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_ngram_range_rejected() {
        let config = KeywordConfig {
            ngram_min: 3,
            ngram_max: 2,
            ..KeywordConfig::default()
        };
        assert!(matches!(
            KeywordExtractor::new(&config, Arc::new(StopWords::empty())),
            Err(MoodError::Config(_))
        ));
    }
}
