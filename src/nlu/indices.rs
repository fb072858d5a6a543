//! Index sub-grammar: `2`, `1, 3`, `1 3 5`, `3-5`, `3 a 5`, `1 e 2`, `1, 3-5 e 7`.

use std::collections::BTreeSet;

use crate::models::command::IndexSet;

use super::ParseError;

/// Maximum number of distinct indices one command may address.
pub const MAX_INDICES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Num(u32),
    Dash,
    Sep,
}

/// Parse index notation into an ascending, duplicate-free [`IndexSet`].
///
/// # Errors
///
/// Returns the [`ParseError`] describing the first problem found: an empty
/// list, index `0`, a negative index, an inverted range, a token that is not
/// part of the grammar, or more than [`MAX_INDICES`] indices.
pub fn normalize_indices(text: &str) -> Result<IndexSet, ParseError> {
    let pieces = scan(text)?;
    let mut values = BTreeSet::new();
    let mut position = 0;
    let mut after_value = false;

    while position < pieces.len() {
        match pieces[position] {
            Piece::Sep => {
                after_value = false;
                position += 1;
            }
            Piece::Dash => {
                if after_value {
                    return Err(ParseError::MalformedIndex("-".into()));
                }
                return match pieces.get(position + 1) {
                    Some(Piece::Num(value)) => Err(ParseError::NegativeIndex(-i64::from(*value))),
                    _ => Err(ParseError::MalformedIndex("-".into())),
                };
            }
            Piece::Num(start) => {
                if pieces.get(position + 1) == Some(&Piece::Dash) {
                    let Some(Piece::Num(end)) = pieces.get(position + 2).copied() else {
                        return Err(ParseError::MalformedIndex(format!("{start}-")));
                    };
                    insert_range(&mut values, start, end)?;
                    position += 3;
                } else {
                    if start == 0 {
                        return Err(ParseError::ZeroIndex);
                    }
                    values.insert(start);
                    position += 1;
                }
                after_value = true;
            }
        }

        if values.len() > MAX_INDICES {
            return Err(ParseError::TooManyIndices {
                count: values.len(),
                max: MAX_INDICES,
            });
        }
    }

    IndexSet::try_from(values.into_iter().collect::<Vec<_>>())
}

fn insert_range(values: &mut BTreeSet<u32>, start: u32, end: u32) -> Result<(), ParseError> {
    if start == 0 || end == 0 {
        return Err(ParseError::ZeroIndex);
    }
    if start > end {
        return Err(ParseError::InvertedRange { start, end });
    }
    let width = u64::from(end - start) + 1;
    let width = usize::try_from(width).unwrap_or(usize::MAX);
    if width > MAX_INDICES {
        return Err(ParseError::TooManyIndices {
            count: width,
            max: MAX_INDICES,
        });
    }
    values.extend(start..=end);
    Ok(())
}

/// Tokenize; whitespace is dropped, commas and "e" are hard separators and
/// "a"/"ate" read as range dashes.
fn scan(text: &str) -> Result<Vec<Piece>, ParseError> {
    let mut pieces = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            if chars.peek().is_some_and(|next| next.is_alphabetic()) {
                while let Some(&l) = chars.peek() {
                    if !l.is_alphanumeric() {
                        break;
                    }
                    digits.push(l);
                    chars.next();
                }
                return Err(ParseError::MalformedIndex(digits));
            }
            let value = digits
                .parse::<u32>()
                .map_err(|_| ParseError::MalformedIndex(digits.clone()))?;
            pieces.push(Piece::Num(value));
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&l) = chars.peek() {
                if !l.is_alphanumeric() {
                    break;
                }
                word.push(l);
                chars.next();
            }
            match word.as_str() {
                "e" => pieces.push(Piece::Sep),
                "a" | "ate" => pieces.push(Piece::Dash),
                _ => return Err(ParseError::MalformedIndex(word)),
            }
        } else {
            chars.next();
            match c {
                ',' | ';' => pieces.push(Piece::Sep),
                '-' | '\u{2010}'..='\u{2015}' | '\u{2212}' => pieces.push(Piece::Dash),
                w if w.is_whitespace() => {}
                other => return Err(ParseError::MalformedIndex(other.to_string())),
            }
        }
    }

    Ok(pieces)
}
