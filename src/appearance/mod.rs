//! Appearance synthesis for signature and initials stamps.
//!
//! Rendering is pure: [`AppearanceRenderer::render`] only computes a content
//! stream and the fonts it needs. Nothing is written into a document until the
//! signer embeds the resulting [`AppearanceStamp`].
//!
//! Signature stamp layout (default 150x50 pt, distances scale with height):
//!
//! ```text
//! +----------------------------------+
//! | Signer Name            (14pt)    |  18pt below top
//! | 2024-05-01 10:30 UTC   (8pt)     |  32pt below top
//! | attribution            (6pt)     |  44pt below top
//! +----------------------------------+
//! ```

mod stamp;

pub use stamp::AppearanceStamp;
pub(crate) use stamp::font_resources;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::placement::MarkKind;
use crate::text::extract_initials;
use crate::text::winansi::encode_with_fallback;
use crate::writer::{ContentStreamBuilder, EmbeddedFont, StampFont, StandardFont};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Height the signature layout constants are given for.
const REFERENCE_HEIGHT: f32 = 50.0;
const NAME_SIZE: f32 = 14.0;
const DATE_SIZE: f32 = 8.0;
const ATTRIBUTION_SIZE: f32 = 6.0;
const INITIALS_SIZE: f32 = 18.0;
const LEFT_INSET: f32 = 5.0;
const BORDER_WIDTH: f32 = 0.5;
/// Names are never shrunk below this size.
const MIN_NAME_SIZE: f32 = 4.0;

/// Stamp timestamp format; a numeric offset is appended when not UTC.
pub const STAMP_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Renders stamps with a fixed font setup.
#[derive(Debug, Clone)]
pub struct AppearanceRenderer {
    name_font: StampFont,
    attribution: String,
}

impl AppearanceRenderer {
    /// Create a renderer, loading the configured script font if any.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let name_font = match &config.script_font {
            Some(path) => {
                let font = EmbeddedFont::from_file(path).map_err(|e| {
                    Error::RenderFailure(format!("script font {}: {}", path.display(), e))
                })?;
                log::debug!("Using embedded script font {}", font.name);
                StampFont::Embedded(Arc::new(font))
            },
            None => StampFont::Standard(StandardFont::TimesItalic),
        };
        Ok(Self {
            name_font,
            attribution: config.attribution.clone(),
        })
    }

    /// Font used for the signer name line.
    pub fn name_font(&self) -> &StampFont {
        &self.name_font
    }

    /// Render one stamp.
    pub fn render(
        &self,
        kind: &MarkKind,
        signer_name: &str,
        timestamp: DateTime<FixedOffset>,
        rect: Rect,
    ) -> Result<AppearanceStamp> {
        let name = signer_name.trim();
        if name.is_empty() {
            return Err(Error::EmptySignerName);
        }
        let dims_ok = |v: f32| v.is_finite() && v > 0.0;
        if !(dims_ok(rect.width) && dims_ok(rect.height) && rect.x.is_finite() && rect.y.is_finite())
        {
            return Err(Error::RenderFailure(format!(
                "invalid stamp rectangle {:?}",
                rect
            )));
        }

        let bbox = Rect::new(0.0, 0.0, rect.width, rect.height);
        let (content, fonts) = match kind {
            MarkKind::Signature { .. } => self.signature_content(name, timestamp, &bbox),
            MarkKind::Initials { .. } => initials_content(&extract_initials(name)?, &bbox),
        };

        Ok(AppearanceStamp {
            kind: kind.clone(),
            rect,
            bbox,
            content,
            fonts,
        })
    }

    fn signature_content(
        &self,
        name: &str,
        timestamp: DateTime<FixedOffset>,
        bbox: &Rect,
    ) -> (Vec<u8>, BTreeMap<String, StampFont>) {
        let helvetica = StampFont::Standard(StandardFont::Helvetica);
        let scale = bbox.height / REFERENCE_HEIGHT;
        let top = bbox.height;

        let mut builder = ContentStreamBuilder::new();
        draw_frame(&mut builder, bbox);

        let encoded_name = encode_with_fallback(name);
        let available = bbox.width - 2.0 * LEFT_INSET;
        let mut name_size = NAME_SIZE * scale;
        let natural = self.name_font.text_width(&encoded_name, name_size);
        if natural > available && natural > 0.0 {
            name_size = (name_size * available / natural).max(MIN_NAME_SIZE);
        }

        let date = encode_with_fallback(&format_stamp_date(timestamp));
        let attribution = encode_with_fallback(&self.attribution);

        builder
            .begin_text()
            .fill_gray(0.0)
            .set_font("F1", name_size)
            .text(&encoded_name, LEFT_INSET, top - 18.0 * scale)
            .fill_gray(0.3)
            .set_font("F2", DATE_SIZE * scale)
            .text(&date, LEFT_INSET, top - 32.0 * scale);
        if !attribution.is_empty() {
            builder
                .fill_gray(0.5)
                .set_font("F2", ATTRIBUTION_SIZE * scale)
                .text(&attribution, LEFT_INSET, top - 44.0 * scale);
        }
        builder.end_text();

        let mut fonts = BTreeMap::new();
        fonts.insert("F1".to_string(), self.name_font.clone());
        fonts.insert("F2".to_string(), helvetica);
        (builder.build(), fonts)
    }
}

fn initials_content(initials: &str, bbox: &Rect) -> (Vec<u8>, BTreeMap<String, StampFont>) {
    let font = StampFont::Standard(StandardFont::Helvetica);
    let encoded = encode_with_fallback(initials);
    let width = font.text_width(&encoded, INITIALS_SIZE);
    // cap height of Helvetica is about 0.718 em
    let x = (bbox.width - width) / 2.0;
    let y = (bbox.height - INITIALS_SIZE * 0.718) / 2.0;

    let mut builder = ContentStreamBuilder::new();
    draw_frame(&mut builder, bbox);
    builder
        .begin_text()
        .fill_gray(0.0)
        .set_font("F1", INITIALS_SIZE)
        .text(&encoded, x, y)
        .end_text();

    let mut fonts = BTreeMap::new();
    fonts.insert("F1".to_string(), font);
    (builder.build(), fonts)
}

/// White background with a thin black border.
fn draw_frame(builder: &mut ContentStreamBuilder, bbox: &Rect) {
    let inset = BORDER_WIDTH / 2.0;
    builder
        .save_state()
        .fill_gray(1.0)
        .stroke_gray(0.0)
        .set_line_width(BORDER_WIDTH)
        .rect(
            inset,
            inset,
            bbox.width - BORDER_WIDTH,
            bbox.height - BORDER_WIDTH,
        )
        .fill_stroke()
        .restore_state();
}

/// Timestamp as printed on signature stamps.
pub fn format_stamp_date(timestamp: DateTime<FixedOffset>) -> String {
    let base = timestamp.format(STAMP_DATE_FORMAT);
    if timestamp.offset().local_minus_utc() == 0 {
        format!("{} UTC", base)
    } else {
        format!("{} {}", base, timestamp.format("%:z"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 10, 30, 0)
            .unwrap()
    }

    fn renderer() -> AppearanceRenderer {
        AppearanceRenderer::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_format_stamp_date() {
        assert_eq!(format_stamp_date(at()), "2024-05-01 10:30 UTC");
        let prague = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .unwrap();
        assert_eq!(format_stamp_date(prague), "2024-05-01 12:30 +02:00");
    }

    #[test]
    fn test_signature_layout() {
        let stamp = renderer()
            .render(&MarkKind::signature(), "Jan Novak", at(), Rect::new(100.0, 100.0, 150.0, 50.0))
            .unwrap();
        let text = String::from_utf8_lossy(&stamp.content).to_string();
        assert!(text.contains("0.25 0.25 149.5 49.5 re\nB\n"));
        assert!(text.contains("/F1 14 Tf\n1 0 0 1 5 32 Tm\n(Jan Novak) Tj"));
        assert!(text.contains("/F2 8 Tf\n1 0 0 1 5 18 Tm\n(2024-05-01 10:30 UTC) Tj"));
        assert!(text.contains("/F2 6 Tf\n1 0 0 1 5 6 Tm\n(github.com/keboola/esignature) Tj"));
        assert_eq!(stamp.bbox, Rect::new(0.0, 0.0, 150.0, 50.0));
        assert_eq!(stamp.fonts.len(), 2);
        assert_eq!(
            stamp.fonts["F1"],
            StampFont::Standard(StandardFont::TimesItalic)
        );
    }

    #[test]
    fn test_long_name_is_shrunk() {
        let stamp = renderer()
            .render(
                &MarkKind::signature(),
                "Maximilian Alexander von Habsburg-Lothringen",
                at(),
                Rect::new(0.0, 0.0, 150.0, 50.0),
            )
            .unwrap();
        let text = String::from_utf8_lossy(&stamp.content).to_string();
        assert!(!text.contains("/F1 14 Tf"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let r = renderer();
        let rect = Rect::new(10.0, 20.0, 150.0, 50.0);
        let a = r.render(&MarkKind::signature(), "Šárka Nováková", at(), rect).unwrap();
        let b = r.render(&MarkKind::signature(), "Šárka Nováková", at(), rect).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_initials_stamp() {
        let stamp = renderer()
            .render(
                &MarkKind::initials(),
                "Ing. Jan Novák Ph.D.",
                at(),
                Rect::new(0.0, 0.0, 50.0, 35.0),
            )
            .unwrap();
        let text = String::from_utf8_lossy(&stamp.content).to_string();
        assert!(text.contains("(JN) Tj"));
        assert!(text.contains("/F1 18 Tf"));
        assert!(!text.contains("2024"));
        assert_eq!(stamp.fonts.len(), 1);
    }

    #[test]
    fn test_empty_name() {
        let err = renderer()
            .render(&MarkKind::signature(), "   ", at(), Rect::new(0.0, 0.0, 150.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, Error::EmptySignerName));
    }

    #[test]
    fn test_degenerate_rect() {
        let err = renderer()
            .render(&MarkKind::signature(), "Jan", at(), Rect::new(0.0, 0.0, 0.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, Error::RenderFailure(_)));
    }

    #[test]
    fn test_unparseable_script_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let config = EngineConfig::default().with_script_font(&path);
        let err = AppearanceRenderer::new(&config).unwrap_err();
        assert!(matches!(err, Error::RenderFailure(_)));
    }
}
