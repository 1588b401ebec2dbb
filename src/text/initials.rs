//! Initials extraction.

use super::transliterate::transliterate;
use crate::error::{Error, Result};

/// Academic titles dropped before initials are taken.
const TITLES: &[&str] = &[
    "ing.", "mgr.", "bc.", "mudr.", "judr.", "phdr.", "rndr.", "doc.", "prof.", "ph.d.", "csc.",
    "drsc.", "mba", "dis.",
];

fn is_title(word: &str) -> bool {
    let lower = word.to_lowercase();
    TITLES.contains(&lower.as_str())
}

/// First letters of the first and last name components, uppercase.
///
/// Titles are stripped and the name is transliterated first, so
/// `"Ing. Jan Novák Ph.D."` gives `"JN"` and `"Šárka"` gives `"S"`.
pub fn extract_initials(name: &str) -> Result<String> {
    let folded = transliterate(name);
    let words: Vec<&str> = folded
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty() && !is_title(w))
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .collect();

    let picked: Vec<&str> = match words.as_slice() {
        [] => return Err(Error::EmptySignerName),
        [only] => vec![*only],
        [first, .., last] => vec![*first, *last],
    };

    Ok(picked
        .iter()
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect())
}
