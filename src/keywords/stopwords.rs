//! Stop-word removal with whole-word matching.

use crate::error::{MoodError, Result};
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Common English function words, dropped from keyword candidates so mixed
/// Korean/English diaries don't surface "the" or "and" as keywords.
pub(crate) const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// A stop-word list compiled into a single whole-word pattern.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: Vec<String>,
    pattern: Option<Regex>,
}

impl StopWords {
    /// An empty list that leaves text untouched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a list of words. Blank entries and duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] if the combined pattern cannot be compiled.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_owned())
            .filter(|w| !w.is_empty())
            .collect();
        // Longest first so a word is never shadowed by its own prefix.
        words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        words.dedup();

        if words.is_empty() {
            return Ok(Self::empty());
        }

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{alternation})\b"))
            .map_err(|e| MoodError::Config(format!("invalid stop-word pattern: {e}")))?;

        Ok(Self {
            words,
            pattern: Some(pattern),
        })
    }

    /// Load a newline-separated stop-word file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the pattern cannot be compiled.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let stopwords = Self::from_words(content.lines())?;
        info!(
            "loaded {} stop words from {}",
            stopwords.len(),
            path.display()
        );
        Ok(stopwords)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Remove every whole-word occurrence of a stop word.
    ///
    /// A stop word embedded in a longer word (`은` inside `오늘은`) is kept.
    pub fn remove<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self.pattern {
            Some(ref pattern) => pattern.replace_all(text, ""),
            None => Cow::Borrowed(text),
        }
    }
}
