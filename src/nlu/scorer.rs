//! Confidence scoring and the dispatch gate.

use crate::models::command::MatchKind;

use super::matcher::Candidate;

const MATCH_WEIGHT: f64 = 0.5;
const COVERAGE_WEIGHT: f64 = 0.3;
const COMPLETENESS_WEIGHT: f64 = 0.2;
const FUZZY_PENALTY: f64 = 0.9;

/// Default dispatch threshold.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// A candidate with its score components.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    /// The candidate.
    pub candidate: Candidate,
    /// Weighted score in `0.0..=1.0`.
    pub score: f64,
    /// Fraction of required entities captured.
    pub completeness: f64,
}

/// Gate decision for the best candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// Score clears the threshold.
    Confident(Scored),
    /// Below threshold only because required entities are missing.
    Plausible(Scored),
    /// Below threshold; the best candidate, if any, is attached for logging.
    Low(Option<Scored>),
}

/// Scores candidates against a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scorer {
    threshold: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl Scorer {
    /// Scorer gating at `threshold`.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score one candidate.
    #[must_use]
    pub fn score(candidate: &Candidate) -> Scored {
        let match_quality = match candidate.kind {
            MatchKind::Exact => 1.0,
            MatchKind::Fuzzy { similarity } => FUZZY_PENALTY * similarity,
        };
        let coverage = ratio(candidate.covered_len, candidate.text_len);
        let required = candidate.intent.schema().required.len();
        let completeness = if required == 0 {
            1.0
        } else {
            ratio(candidate.required_present(), required)
        };
        let score = MATCH_WEIGHT * match_quality
            + COVERAGE_WEIGHT * coverage
            + COMPLETENESS_WEIGHT * completeness;
        Scored {
            candidate: candidate.clone(),
            score: score.clamp(0.0, 1.0),
            completeness,
        }
    }

    /// Pick the best-scoring candidate and gate it.
    ///
    /// `candidates` must be in matcher resolution order; equal scores keep
    /// the earlier one.
    #[must_use]
    pub fn gate(&self, candidates: &[Candidate]) -> Gate {
        let mut best: Option<Scored> = None;
        for candidate in candidates {
            let scored = Self::score(candidate);
            if best.as_ref().is_none_or(|current| scored.score > current.score) {
                best = Some(scored);
            }
        }

        match best {
            Some(scored) if scored.score >= self.threshold => Gate::Confident(scored),
            Some(scored) if self.is_plausible(&scored) => Gate::Plausible(scored),
            other => Gate::Low(other),
        }
    }

    fn is_plausible(&self, scored: &Scored) -> bool {
        scored.completeness < 1.0
            && scored.score + COMPLETENESS_WEIGHT * (1.0 - scored.completeness) >= self.threshold
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).min(1.0)
}
