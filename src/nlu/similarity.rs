//! Pluggable string-similarity strategies for typo-tolerant matching.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// String similarity score in `0.0..=1.0`, `1.0` for identical inputs.
pub trait Similarity: Send + Sync + Debug {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Similarity between `a` and `b`.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Jaro-Winkler; favours shared prefixes, which suits short command words.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn name(&self) -> &'static str {
        "jaro_winkler"
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }
}

/// Levenshtein distance normalized by the longer input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Similarity for Levenshtein {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Configurable strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStrategy {
    /// [`JaroWinkler`].
    #[default]
    JaroWinkler,
    /// [`Levenshtein`].
    Levenshtein,
}

impl SimilarityStrategy {
    /// Instantiate the selected strategy.
    #[must_use]
    pub fn build(self) -> Arc<dyn Similarity> {
        match self {
            Self::JaroWinkler => Arc::new(JaroWinkler),
            Self::Levenshtein => Arc::new(Levenshtein),
        }
    }
}

/// Closest vocabulary entry at or above `min_similarity`.
///
/// Ties keep the earlier entry, so vocabulary order is the tie-breaker.
#[must_use]
pub fn best_match<'v>(
    similarity: &dyn Similarity,
    needle: &str,
    vocabulary: impl IntoIterator<Item = &'v str>,
    min_similarity: f64,
) -> Option<(&'v str, f64)> {
    let mut best: Option<(&'v str, f64)> = None;
    for candidate in vocabulary {
        let score = similarity.similarity(needle, candidate);
        if score < min_similarity {
            continue;
        }
        if best.is_none_or(|(_, current)| score > current) {
            best = Some((candidate, score));
        }
    }
    best
}
