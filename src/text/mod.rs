//! Text utilities for stamps and signature dictionaries.
//!
//! Standard PDF fonts only understand single-byte encodings, so signer names
//! pass through [`transliterate`] and [`winansi`] before they reach a content
//! stream. [`initials`] derives the short mark printed on initials stamps.

pub mod initials;
pub mod transliterate;
pub mod winansi;

pub use initials::extract_initials;
pub use transliterate::transliterate;

/// Encode a string as a PDF text string.
///
/// Printable ASCII is kept as-is (PDFDocEncoding agrees with ASCII there).
/// Anything else is written as UTF-16BE with a byte order mark.
pub fn pdf_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (' '..='~').contains(&c)) {
        return text.as_bytes().to_vec();
    }
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFE, 0xFF]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_text_string_ascii() {
        assert_eq!(pdf_text_string("Jan Novak"), b"Jan Novak".to_vec());
    }

    #[test]
    fn test_pdf_text_string_utf16() {
        let bytes = pdf_text_string("Šárka");
        assert_eq!(&bytes[..4], &[0xFE, 0xFF, 0x01, 0x60]);
        assert_eq!(bytes.len(), 2 + 5 * 2);
    }
}
