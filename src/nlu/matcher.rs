//! Pattern matcher: collects and orders candidate matches for normalized text.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::command::{EntityName, Intent, MatchKind};

use super::normalizer::synonym_entries;
use super::patterns::{capture_entity, CompiledPattern, PatternTable};
use super::similarity::{best_match, Similarity};

/// Minimum first-token length the fuzzy pass will try to correct.
const MIN_FUZZY_TOKEN_CHARS: usize = 3;

/// One pattern that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Pattern identifier.
    pub pattern_id: &'static str,
    /// Intent the pattern classifies as.
    pub intent: Intent,
    /// Raw (normalized) text of each named group that matched non-empty.
    pub captures: BTreeMap<EntityName, String>,
    /// Non-space characters matched by literal pattern text.
    pub literal_len: usize,
    /// Non-space characters inside the overall match.
    pub covered_len: usize,
    /// Non-space characters in the whole text searched.
    pub text_len: usize,
    /// Static pattern priority.
    pub priority: u8,
    /// Verbatim or after a fuzzy keyword correction.
    pub kind: MatchKind,
    /// Pattern table position.
    pub order: usize,
}

impl Candidate {
    /// Required entities of the intent present among the captures.
    #[must_use]
    pub fn required_present(&self) -> usize {
        self.intent
            .schema()
            .required
            .iter()
            .filter(|name| self.captures.contains_key(name))
            .count()
    }
}

/// Matches normalized text against the pattern table, with a fuzzy retry.
#[derive(Debug, Clone)]
pub struct Matcher {
    table: PatternTable,
    similarity: Arc<dyn Similarity>,
    min_similarity: f64,
    /// `(spelling, canonical keyword)` pairs the first token may be corrected to.
    vocabulary: Vec<(&'static str, &'static str)>,
}

impl Matcher {
    /// Build a matcher over `table`.
    #[must_use]
    pub fn new(table: PatternTable, similarity: Arc<dyn Similarity>, min_similarity: f64) -> Self {
        let keywords = table.keywords();
        let mut vocabulary: Vec<(&'static str, &'static str)> =
            keywords.iter().map(|keyword| (*keyword, *keyword)).collect();
        vocabulary.extend(
            synonym_entries()
                .iter()
                .filter(|(_, canonical)| keywords.contains(canonical))
                .copied(),
        );
        Self {
            table,
            similarity,
            min_similarity,
            vocabulary,
        }
    }

    /// Candidates for `normalized`, best first.
    ///
    /// Ordering: longest literal text covered, then most entities captured,
    /// then static priority, then table order. The fuzzy pass runs only when
    /// no pattern matches verbatim.
    #[must_use]
    pub fn candidates(&self, normalized: &str) -> Vec<Candidate> {
        let mut found = self.collect(normalized, MatchKind::Exact);
        if found.is_empty() {
            if let Some((rewritten, similarity)) = self.fuzzy_rewrite(normalized) {
                tracing::debug!(rewritten = %rewritten, similarity, "fuzzy keyword correction");
                found = self.collect(&rewritten, MatchKind::Fuzzy { similarity });
            }
        }
        found.sort_by(|a, b| {
            b.literal_len
                .cmp(&a.literal_len)
                .then_with(|| b.captures.len().cmp(&a.captures.len()))
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.order.cmp(&b.order))
        });
        found
    }

    fn collect(&self, text: &str, kind: MatchKind) -> Vec<Candidate> {
        let text_len = non_space_len(text);
        self.table
            .patterns()
            .iter()
            .filter_map(|pattern| match_one(pattern, text, text_len, kind))
            .collect()
    }

    /// Correct the first token towards the closest trigger keyword.
    fn fuzzy_rewrite(&self, text: &str) -> Option<(String, f64)> {
        let (first, rest) = match text.split_once(' ') {
            Some((first, rest)) => (first, Some(rest)),
            None => (text, None),
        };
        if first.chars().count() < MIN_FUZZY_TOKEN_CHARS
            || self.vocabulary.iter().any(|(spelling, _)| *spelling == first)
        {
            return None;
        }

        let spellings = self.vocabulary.iter().map(|(spelling, _)| *spelling);
        let (spelling, similarity) =
            best_match(self.similarity.as_ref(), first, spellings, self.min_similarity)?;
        let canonical = self
            .vocabulary
            .iter()
            .find(|(candidate, _)| *candidate == spelling)
            .map(|(_, canonical)| *canonical)?;

        let rewritten = match rest {
            Some(rest) => format!("{canonical} {rest}"),
            None => canonical.to_owned(),
        };
        Some((rewritten, similarity))
    }
}

fn match_one(
    pattern: &CompiledPattern,
    text: &str,
    text_len: usize,
    kind: MatchKind,
) -> Option<Candidate> {
    let caps = pattern.regex.captures(text)?;
    let whole = caps.get(0)?;
    let covered_len = non_space_len(whole.as_str());

    let mut captures = BTreeMap::new();
    let mut captured_len = 0;
    for group in pattern.regex.capture_names().flatten() {
        let (Some(entity), Some(value)) = (capture_entity(group), caps.name(group)) else {
            continue;
        };
        captured_len += non_space_len(value.as_str());
        let trimmed = value.as_str().trim();
        if !trimmed.is_empty() {
            captures.insert(entity, trimmed.to_owned());
        }
    }

    Some(Candidate {
        pattern_id: pattern.id,
        intent: pattern.intent,
        captures,
        literal_len: covered_len.saturating_sub(captured_len),
        covered_len,
        text_len,
        priority: pattern.priority,
        kind,
        order: pattern.order,
    })
}

fn non_space_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
