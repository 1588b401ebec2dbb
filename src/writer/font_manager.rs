//! Font metrics and font resources for stamps and the protocol page.
//!
//! Two kinds of fonts are supported:
//! - PDF Base-14 fonts ([`StandardFont`]) that every viewer ships, described by
//!   their AFM advance widths;
//! - TrueType fonts embedded as simple fonts ([`EmbeddedFont`]) with
//!   WinAnsiEncoding, so they share the single-byte text path of the standard
//!   fonts. Per PDF spec Section 9.6.3, these carry `/Widths`, a
//!   `/FontDescriptor` and the font program in `/FontFile2`.
//!
//! Fonts written into one signing batch are cached in a [`FontRegistry`] so
//! every stamp reuses the same indirect objects.

use super::content_stream::flate_encode;
use super::incremental::RevisionWriter;
use crate::error::{Error, Result};
use crate::text::winansi::winansi_to_unicode;
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// First character code described by `/Widths`.
pub const FIRST_CHAR: u8 = 32;
/// Last character code described by `/Widths`.
pub const LAST_CHAR: u8 = 255;

/// Standard Base-14 fonts used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    /// Helvetica, for timestamps, initials and the protocol page
    Helvetica,
    /// Times-Italic, the fallback face for signer names
    TimesItalic,
}

// AFM advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const TIMES_ITALIC_WIDTHS: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

/// Base letter whose advance an accented WinAnsi letter shares.
fn accent_base(byte: u8) -> Option<u8> {
    let base = match byte {
        0x8A => b'S',
        0x8E => b'Z',
        0x9A => b's',
        0x9E => b'z',
        0x9F | 0xDD => b'Y',
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD9..=0xDC => b'U',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF1 => b'n',
        0xF2..=0xF6 | 0xF8 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        _ => return None,
    };
    Some(base)
}

impl StandardFont {
    /// PostScript name written as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::TimesItalic => "Times-Italic",
        }
    }

    fn table(&self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::TimesItalic => &TIMES_ITALIC_WIDTHS,
        }
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    pub fn byte_width(&self, byte: u8) -> u16 {
        let lookup = |b: u8| self.table()[(b - 32) as usize];
        match byte {
            32..=126 => lookup(byte),
            _ => match accent_base(byte) {
                Some(base) => lookup(base),
                None => 500,
            },
        }
    }

    /// Font dictionary for the resource.
    pub fn dictionary(&self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

/// A TrueType font embedded as a simple font with WinAnsiEncoding.
#[derive(Clone, PartialEq)]
pub struct EmbeddedFont {
    /// PostScript name used as `/BaseFont`
    pub name: String,
    data: Arc<Vec<u8>>,
    /// Widths for codes `FIRST_CHAR..=LAST_CHAR` in 1/1000 em
    widths: Vec<u16>,
    ascent: i32,
    descent: i32,
    cap_height: i32,
    bbox: [i32; 4],
    italic_angle: f32,
    flags: u32,
}

impl fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl EmbeddedFont {
    /// Parse a TrueType font program.
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| Error::Font(format!("Failed to parse font: {}", e)))?;

        let units = face.units_per_em().max(1) as f32;
        let scale = |v: f32| (v * 1000.0 / units).round() as i32;

        let widths = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| {
                winansi_to_unicode(code)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| scale(adv as f32).max(0) as u16)
                    .unwrap_or(0)
            })
            .collect();

        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| {
                n.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "SignatureScript".to_string());

        let bb = face.global_bounding_box();
        let italic_angle = face.italic_angle().unwrap_or(0.0);

        // Nonsymbolic, plus FixedPitch/Italic when the font says so
        let mut flags = 32;
        if face.is_monospaced() {
            flags |= 1;
        }
        if face.is_italic() || italic_angle != 0.0 {
            flags |= 64;
        }

        log::debug!("Parsed embedded font {} ({} bytes)", name, data.len());

        Ok(Self {
            name,
            widths,
            ascent: scale(face.ascender() as f32),
            descent: scale(face.descender() as f32),
            cap_height: scale(face.capital_height().unwrap_or(face.ascender()) as f32),
            bbox: [
                scale(bb.x_min as f32),
                scale(bb.y_min as f32),
                scale(bb.x_max as f32),
                scale(bb.y_max as f32),
            ],
            italic_angle,
            flags,
            data: Arc::new(data),
        })
    }

    /// Load an embedded font from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())
            .map_err(|e| Error::Font(format!("Failed to read font file: {}", e)))?;
        Self::from_data(data)
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    pub fn byte_width(&self, byte: u8) -> u16 {
        if byte < FIRST_CHAR {
            return 0;
        }
        self.widths
            .get((byte - FIRST_CHAR) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Font program stream (`/FontFile2`).
    pub fn font_file(&self) -> Result<Stream> {
        let compressed = flate_encode(&self.data)?;
        Ok(Stream::new(
            dictionary! {
                "Filter" => "FlateDecode",
                "Length1" => self.data.len() as i64,
            },
            compressed,
        ))
    }

    /// Font descriptor pointing at the font program.
    pub fn descriptor(&self, font_file: ObjectId) -> Dictionary {
        dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.name.as_bytes().to_vec()),
            "Flags" => self.flags as i64,
            "FontBBox" => self.bbox.iter().map(|v| Object::Integer(*v as i64)).collect::<Vec<_>>(),
            "ItalicAngle" => self.italic_angle,
            "Ascent" => self.ascent as i64,
            "Descent" => self.descent as i64,
            "CapHeight" => self.cap_height as i64,
            "StemV" => 80,
            "FontFile2" => font_file,
        }
    }

    /// Font dictionary pointing at the descriptor.
    pub fn dictionary(&self, descriptor: ObjectId) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => Object::Name(self.name.as_bytes().to_vec()),
            "FirstChar" => FIRST_CHAR as i64,
            "LastChar" => LAST_CHAR as i64,
            "Widths" => self.widths.iter().map(|w| Object::Integer(*w as i64)).collect::<Vec<_>>(),
            "FontDescriptor" => descriptor,
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

/// A font a stamp or page refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum StampFont {
    /// Base-14 font
    Standard(StandardFont),
    /// Embedded TrueType font
    Embedded(Arc<EmbeddedFont>),
}

impl StampFont {
    /// Advance width of a WinAnsi byte in 1/1000 em.
    pub fn byte_width(&self, byte: u8) -> u16 {
        match self {
            StampFont::Standard(font) => font.byte_width(byte),
            StampFont::Embedded(font) => font.byte_width(byte),
        }
    }

    /// Width of encoded text in points.
    pub fn text_width(&self, encoded: &[u8], font_size: f32) -> f32 {
        let units: u32 = encoded.iter().map(|b| self.byte_width(*b) as u32).sum();
        units as f32 * font_size / 1000.0
    }

    fn cache_key(&self) -> String {
        match self {
            StampFont::Standard(font) => format!("std:{}", font.base_font()),
            StampFont::Embedded(font) => format!("ttf:{}:{}", font.name, font.data.len()),
        }
    }
}

/// Font objects already written during a signing batch.
#[derive(Debug, Default)]
pub struct FontRegistry {
    ids: HashMap<String, ObjectId>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id of the font dictionary, writing it into `writer` on first use.
    pub fn resolve(&mut self, font: &StampFont, writer: &mut RevisionWriter) -> Result<ObjectId> {
        let key = font.cache_key();
        if let Some(id) = self.ids.get(&key) {
            return Ok(*id);
        }
        let id = match font {
            StampFont::Standard(std_font) => writer.add_object(std_font.dictionary()),
            StampFont::Embedded(embedded) => {
                let file = writer.add_object(embedded.font_file()?);
                let descriptor = writer.add_object(embedded.descriptor(file));
                writer.add_object(embedded.dictionary(descriptor))
            },
        };
        self.ids.insert(key, id);
        Ok(id)
    }
}
