//! WinAnsi (Windows-1252) encoding for standard-font text.
//!
//! Latin-1 code points map to themselves. The 0x80-0x9F block holds the
//! Windows-specific punctuation and the few Central European letters
//! Windows-1252 carries (Š, š, Ž, ž).

use super::transliterate::fold_char;
use phf::phf_map;

/// Byte written for characters that cannot be encoded.
pub const REPLACEMENT: u8 = b'?';

static WINANSI_HIGH: phf::Map<char, u8> = phf_map! {
    '\u{20AC}' => 0x80, // Euro sign
    '\u{201A}' => 0x82, // Single low-9 quotation mark
    '\u{0192}' => 0x83, // Latin small letter f with hook
    '\u{201E}' => 0x84, // Double low-9 quotation mark
    '\u{2026}' => 0x85, // Horizontal ellipsis
    '\u{2020}' => 0x86, // Dagger
    '\u{2021}' => 0x87, // Double dagger
    '\u{02C6}' => 0x88, // Modifier letter circumflex accent
    '\u{2030}' => 0x89, // Per mille sign
    '\u{0160}' => 0x8A, // Latin capital letter S with caron
    '\u{2039}' => 0x8B, // Single left-pointing angle quotation mark
    '\u{0152}' => 0x8C, // Latin capital ligature OE
    '\u{017D}' => 0x8E, // Latin capital letter Z with caron
    '\u{2018}' => 0x91, // Left single quotation mark
    '\u{2019}' => 0x92, // Right single quotation mark
    '\u{201C}' => 0x93, // Left double quotation mark
    '\u{201D}' => 0x94, // Right double quotation mark
    '\u{2022}' => 0x95, // Bullet
    '\u{2013}' => 0x96, // En dash
    '\u{2014}' => 0x97, // Em dash
    '\u{02DC}' => 0x98, // Small tilde
    '\u{2122}' => 0x99, // Trade mark sign
    '\u{0161}' => 0x9A, // Latin small letter s with caron
    '\u{203A}' => 0x9B, // Single right-pointing angle quotation mark
    '\u{0153}' => 0x9C, // Latin small ligature oe
    '\u{017E}' => 0x9E, // Latin small letter z with caron
    '\u{0178}' => 0x9F, // Latin capital letter Y with diaeresis
};

/// Map a character to its WinAnsi byte.
///
/// Control characters have no glyph and are reported as unencodable.
pub fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..0x7F).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    WINANSI_HIGH.get(&ch).copied()
}

/// Map a WinAnsi byte back to its character.
pub fn winansi_to_unicode(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
        _ => WINANSI_HIGH
            .entries()
            .find(|(_, code)| **code == byte)
            .map(|(ch, _)| *ch),
    }
}

/// Check if a character can be encoded in WinAnsi.
pub fn is_winansi_char(ch: char) -> bool {
    unicode_to_winansi(ch).is_some()
}

/// Encode text, replacing unencodable characters with `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| unicode_to_winansi(c).unwrap_or(REPLACEMENT))
        .collect()
}

/// Encode text, folding Czech letters WinAnsi lacks before giving up.
///
/// Letters WinAnsi can show (á, é, Š, ž) keep their accents. Letters it cannot
/// (č, ř, ů) fall back to their base letter.
pub fn encode_with_fallback(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            unicode_to_winansi(c)
                .or_else(|| fold_char(c).and_then(unicode_to_winansi))
                .unwrap_or(REPLACEMENT)
        })
        .collect()
}
