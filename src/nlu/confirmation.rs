//! Yes/no classifier for pending confirmations.

use super::normalizer::{normalize_with, NormalizerOptions};

const YES: &[&str] = &[
    "sim", "s", "yes", "y", "pode", "claro", "confirmo", "confirmar", "confirma", "ok", "okay",
    "isso", "bora", "certo", "1", "👍", "✅", "👌",
];

const NO: &[&str] = &[
    "nao", "n", "no", "negativo", "cancelar", "2", "👎", "❌",
];

const FILLER: &[&str] = &["por", "favor", "obrigado", "obrigada", "mesmo", "e", "ai"];

/// Outcome of classifying a reply to a confirmation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    /// Clear affirmative.
    Yes,
    /// Clear negative.
    No,
    /// Mixed, unknown or empty.
    Ambiguous,
}

/// Classify raw reply text.
///
/// Emoji are kept and skin-tone modifiers ignored, so `👍🏽` reads as yes. A
/// reply that mixes yes and no words, or contains any unknown word, is
/// ambiguous.
#[must_use]
pub fn classify(raw: &str) -> ConfirmationReply {
    let normalized = normalize_with(raw, NormalizerOptions { strip_emoji: false });
    let mut yes = false;
    let mut no = false;

    for token in normalized.split(' ').filter(|t| !t.is_empty()) {
        for word in split_symbols(token.trim_end_matches(',')) {
            match lookup(&word) {
                Some(ConfirmationReply::Yes) => yes = true,
                Some(ConfirmationReply::No) => no = true,
                Some(ConfirmationReply::Ambiguous) => {}
                None => return ConfirmationReply::Ambiguous,
            }
        }
    }

    match (yes, no) {
        (true, false) => ConfirmationReply::Yes,
        (false, true) => ConfirmationReply::No,
        _ => ConfirmationReply::Ambiguous,
    }
}

/// Whether normalized text is a cancellation phrase ("cancelar", "nao",
/// "deixa pra la", "esquece isso", ...).
#[must_use]
pub fn is_cancellation(normalized: &str) -> bool {
    let mut tokens = normalized
        .split(' ')
        .map(|t| t.trim_end_matches(','))
        .filter(|t| !t.is_empty())
        .peekable();
    if tokens.peek().is_none() {
        return false;
    }
    let mut cancel = false;
    for token in tokens {
        match token {
            "cancelar" | "nao" | "pare" | "parar" => cancel = true,
            "tudo" | "isso" | "por" | "favor" | "mais" | "quero" => {}
            _ => return false,
        }
    }
    cancel
}

/// `Ambiguous` here marks a filler word.
fn lookup(word: &str) -> Option<ConfirmationReply> {
    let squeezed = squeeze(word);
    let known = |set: &[&str]| set.contains(&word) || set.contains(&squeezed.as_str());
    if known(YES) {
        Some(ConfirmationReply::Yes)
    } else if known(NO) {
        Some(ConfirmationReply::No)
    } else if known(FILLER) || word.is_empty() {
        Some(ConfirmationReply::Ambiguous)
    } else {
        None
    }
}

/// Split a token into letter runs and individual symbols, dropping skin
/// tones and emoji joiners: `sim👍` → `sim`, `👍`.
fn split_symbols(token: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in token.chars() {
        if is_modifier(c) {
            continue;
        }
        if c.is_alphanumeric() {
            current.push(c);
        } else {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            words.push(c.to_string());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn is_modifier(c: char) -> bool {
    matches!(u32::from(c), 0x1F3FB..=0x1F3FF | 0xFE0F | 0x200D)
}

/// Collapse every repeated letter to one: `siim` → `sim`.
fn squeeze(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for c in word.chars() {
        if !out.ends_with(c) {
            out.push(c);
        }
    }
    out
}
