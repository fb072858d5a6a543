//! One-shot classification: normalize, match, score and resolve entities.

use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::models::command::{Entities, ParsedCommand};

use super::entities::EntityResolver;
use super::matcher::Matcher;
use super::normalizer::{normalize_with, NormalizerOptions};
use super::patterns::PatternTable;
use super::scorer::{Gate, Scorer};
use super::similarity::SimilarityStrategy;
use super::ParseError;

/// Tunables for the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    /// Dispatch threshold.
    pub confidence_threshold: f64,
    /// Similarity strategy for fuzzy keyword and vocabulary matching.
    pub strategy: SimilarityStrategy,
    /// Minimum similarity accepted by fuzzy lookups.
    pub min_similarity: f64,
    /// Normalizer switches.
    pub normalizer: NormalizerOptions,
    /// Known project names.
    pub projects: Vec<String>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: super::scorer::DEFAULT_CONFIDENCE_THRESHOLD,
            strategy: SimilarityStrategy::default(),
            min_similarity: 0.82,
            normalizer: NormalizerOptions::default(),
            projects: Vec::new(),
        }
    }
}

/// What the analyzer concluded about one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Intent classified and every captured entity resolved. Required
    /// entities may still be missing.
    Accepted,
    /// Intent classified but a captured entity is malformed.
    Rejected(ParseError),
    /// Nothing cleared the threshold.
    LowConfidence,
}

/// Classification of one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Parsed command (intent `None` for low confidence).
    pub parsed: ParsedCommand,
    /// Gate outcome.
    pub verdict: Verdict,
}

/// Stateless classifier shared by all workers.
#[derive(Debug, Clone)]
pub struct Analyzer {
    matcher: Matcher,
    scorer: Scorer,
    resolver: Arc<EntityResolver>,
    normalizer: NormalizerOptions,
}

impl Analyzer {
    /// Compile the pattern table and wire the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the built-in pattern table fails to compile.
    pub fn new(settings: &AnalyzerSettings) -> Result<Self> {
        let similarity = settings.strategy.build();
        let matcher = Matcher::new(
            PatternTable::builtin()?,
            Arc::clone(&similarity),
            settings.min_similarity,
        );
        let resolver = EntityResolver::new(
            similarity,
            settings.min_similarity,
            settings.normalizer,
            &settings.projects,
        );
        Ok(Self {
            matcher,
            scorer: Scorer::new(settings.confidence_threshold),
            resolver: Arc::new(resolver),
            normalizer: settings.normalizer,
        })
    }

    /// Normalize with the configured options.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        normalize_with(text, self.normalizer)
    }

    /// Entity resolver used for slot filling.
    #[must_use]
    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Classify a message from scratch.
    #[must_use]
    pub fn analyze(&self, original: &str) -> Analysis {
        let normalized = self.normalize(original);
        self.analyze_normalized(original, &normalized)
    }

    /// Classify a message that has already been normalized.
    #[must_use]
    pub fn analyze_normalized(&self, original: &str, normalized: &str) -> Analysis {
        let candidates = self.matcher.candidates(normalized);
        let scored = match self.scorer.gate(&candidates) {
            Gate::Confident(scored) => scored,
            Gate::Plausible(scored) => {
                debug!(
                    pattern = scored.candidate.pattern_id,
                    score = scored.score,
                    "below threshold but only missing entities"
                );
                scored
            }
            Gate::Low(best) => {
                debug!(
                    best = best.as_ref().map(|s| s.candidate.pattern_id),
                    score = best.as_ref().map(|s| s.score),
                    "low confidence"
                );
                let mut parsed = ParsedCommand::unmatched(original, normalized);
                parsed.confidence = best.map_or(0.0, |s| s.score);
                return Analysis {
                    parsed,
                    verdict: Verdict::LowConfidence,
                };
            }
        };

        let candidate = scored.candidate;
        let (entities, verdict) = match self.resolver.extract(&candidate.captures, original) {
            Ok(entities) => (entities, Verdict::Accepted),
            Err(err) => (Entities::new(), Verdict::Rejected(err)),
        };

        Analysis {
            parsed: ParsedCommand {
                original_text: original.to_owned(),
                normalized_text: normalized.to_owned(),
                intent: candidate.intent,
                entities,
                confidence: scored.score,
                matched_pattern_id: Some(candidate.pattern_id.to_owned()),
                match_kind: Some(candidate.kind),
            },
            verdict,
        }
    }
}
