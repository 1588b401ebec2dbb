//! Rendered stamps and their form XObjects.

use crate::error::Result;
use crate::geometry::Rect;
use crate::placement::MarkKind;
use crate::writer::{flate_encode, FontRegistry, RevisionWriter, StampFont};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use std::collections::BTreeMap;

/// A rendered appearance, ready to be embedded.
///
/// Stamps are plain values: rendering the same input twice yields equal stamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceStamp {
    /// Kind of mark this stamp shows
    pub kind: MarkKind,
    /// Placement on the page, in user space
    pub rect: Rect,
    /// Form bounding box, origin at the stamp's lower-left corner
    pub bbox: Rect,
    /// Uncompressed content stream
    pub content: Vec<u8>,
    /// Font resources by resource name
    pub fonts: BTreeMap<String, StampFont>,
}

impl AppearanceStamp {
    /// Write the stamp as a form XObject and return its id.
    ///
    /// Fonts go through `registry`, so stamps in one revision share them.
    pub fn write_form_xobject(
        &self,
        registry: &mut FontRegistry,
        writer: &mut RevisionWriter,
    ) -> Result<ObjectId> {
        let resources = font_resources(&self.fonts, registry, writer)?;
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => self.bbox.to_pdf_array(),
                "Resources" => resources,
                "Filter" => "FlateDecode",
            },
            flate_encode(&self.content)?,
        );
        Ok(writer.add_object(stream))
    }
}

/// Build a `/Resources` dictionary for a set of fonts.
pub(crate) fn font_resources(
    fonts: &BTreeMap<String, StampFont>,
    registry: &mut FontRegistry,
    writer: &mut RevisionWriter,
) -> Result<Dictionary> {
    let mut font_dict = Dictionary::new();
    for (name, font) in fonts {
        let id = registry.resolve(font, writer)?;
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(id));
    }
    Ok(dictionary! { "Font" => font_dict })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::StandardFont;

    #[test]
    fn test_form_xobject_shares_fonts() {
        let mut fonts = BTreeMap::new();
        fonts.insert("F1".to_string(), StampFont::Standard(StandardFont::Helvetica));
        let stamp = AppearanceStamp {
            kind: MarkKind::initials(),
            rect: Rect::new(10.0, 10.0, 50.0, 35.0),
            bbox: Rect::new(0.0, 0.0, 50.0, 35.0),
            content: b"BT /F1 18 Tf (JN) Tj ET".to_vec(),
            fonts,
        };

        let mut writer = RevisionWriter::new(9);
        let mut registry = FontRegistry::new();
        let first = stamp.write_form_xobject(&mut registry, &mut writer).unwrap();
        let second = stamp.write_form_xobject(&mut registry, &mut writer).unwrap();
        assert_ne!(first, second);
        // one font plus two forms
        assert_eq!(writer.object_count(), 3);
    }
}
