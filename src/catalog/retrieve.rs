//! Candidate retrieval by emotion class.

use super::{Catalog, Song};
use crate::emotion::EmotionClass;

/// Songs matching the diary's intensity and, unless neutral, its quadrant.
///
/// Catalog order is preserved. An empty result is a normal outcome.
pub fn retrieve<'a>(catalog: &'a Catalog, class: &EmotionClass) -> Vec<&'a Song> {
    let by_quadrant = class.filters_by_quadrant();
    catalog
        .songs()
        .iter()
        .filter(|s| s.intensity == class.intensity)
        .filter(|s| !by_quadrant || s.emotion == class.quadrant)
        .collect()
}
