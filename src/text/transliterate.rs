//! Czech diacritics folding.
//!
//! This is an explicit table, not a general Unicode decomposition. Letters
//! outside it pass through unchanged.

use phf::phf_map;

static CZECH_FOLD: phf::Map<char, char> = phf_map! {
    'á' => 'a', 'č' => 'c', 'ď' => 'd', 'é' => 'e', 'ě' => 'e',
    'í' => 'i', 'ň' => 'n', 'ó' => 'o', 'ř' => 'r', 'š' => 's',
    'ť' => 't', 'ú' => 'u', 'ů' => 'u', 'ý' => 'y', 'ž' => 'z',
    'Á' => 'A', 'Č' => 'C', 'Ď' => 'D', 'É' => 'E', 'Ě' => 'E',
    'Í' => 'I', 'Ň' => 'N', 'Ó' => 'O', 'Ř' => 'R', 'Š' => 'S',
    'Ť' => 'T', 'Ú' => 'U', 'Ů' => 'U', 'Ý' => 'Y', 'Ž' => 'Z',
};

/// Fold a single character, if the table knows it.
pub fn fold_char(ch: char) -> Option<char> {
    CZECH_FOLD.get(&ch).copied()
}

/// Replace every Czech accented letter with its base Latin letter.
///
/// ```
/// use pdf_countersign::text::transliterate;
///
/// assert_eq!(transliterate("Příliš žluťoučký kůň"), "Prilis zlutoucky kun");
/// ```
pub fn transliterate(text: &str) -> String {
    text.chars().map(|c| fold_char(c).unwrap_or(c)).collect()
}
