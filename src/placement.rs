//! Where marks go.
//!
//! A [`PlacementRequest`] names a page and a position expressed as fractions
//! of the visible page area, so front ends never need to know page sizes.
//! [`resolve_rect`] turns that into a rectangle in PDF user space.

use crate::config::{EngineConfig, StampSize};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Page corner used to anchor initials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    /// Lower-left corner
    BottomLeft,
    /// Lower-right corner
    BottomRight,
}

/// What kind of mark to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkKind {
    /// Full signature stamp
    Signature {
        /// Optional caller label, kept for reporting
        #[serde(default)]
        label: Option<String>,
    },
    /// Initials stamp
    Initials {
        /// Anchor corner; overrides the request position when set
        #[serde(default)]
        corner: Option<Corner>,
    },
}

impl MarkKind {
    /// A signature with no label.
    pub fn signature() -> Self {
        MarkKind::Signature { label: None }
    }

    /// Initials placed at the request position.
    pub fn initials() -> Self {
        MarkKind::Initials { corner: None }
    }

    /// Whether this is an initials mark.
    pub fn is_initials(&self) -> bool {
        matches!(self, MarkKind::Initials { .. })
    }

    /// Short human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            MarkKind::Signature { .. } => "Signature",
            MarkKind::Initials { .. } => "Initials",
        }
    }
}

/// Stamp origin as fractions of the visible page, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    /// Horizontal fraction in `[0, 1]`
    pub x: f32,
    /// Vertical fraction in `[0, 1]`
    pub y: f32,
}

impl NormalizedPosition {
    /// Create a position.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn validate(&self) -> Result<()> {
        let ok = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if ok(self.x) && ok(self.y) {
            Ok(())
        } else {
            Err(Error::RenderFailure(format!(
                "position ({}, {}) is outside the page",
                self.x, self.y
            )))
        }
    }
}

/// One mark to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Mark kind
    pub kind: MarkKind,
    /// 0-based page index
    pub page: usize,
    /// Lower-left corner of the stamp
    pub position: NormalizedPosition,
}

impl PlacementRequest {
    /// A signature at `(x, y)` on `page`.
    pub fn signature(page: usize, x: f32, y: f32) -> Self {
        Self {
            kind: MarkKind::signature(),
            page,
            position: NormalizedPosition::new(x, y),
        }
    }

    /// Initials at `(x, y)` on `page`.
    pub fn initials(page: usize, x: f32, y: f32) -> Self {
        Self {
            kind: MarkKind::initials(),
            page,
            position: NormalizedPosition::new(x, y),
        }
    }

    /// One corner-anchored initials request per listed page.
    pub fn initials_on_pages(pages: impl IntoIterator<Item = usize>, corner: Corner) -> Vec<Self> {
        pages
            .into_iter()
            .map(|page| Self {
                kind: MarkKind::Initials {
                    corner: Some(corner),
                },
                page,
                position: NormalizedPosition::new(0.0, 0.0),
            })
            .collect()
    }

    /// Stamp size for this request.
    pub fn stamp_size(&self, config: &EngineConfig) -> StampSize {
        match self.kind {
            MarkKind::Signature { .. } => config.signature_size,
            MarkKind::Initials { .. } => config.initials_size,
        }
    }
}

/// Corner-anchored initials on every page of a `page_count`-page document.
pub fn initials_everywhere(page_count: usize, corner: Corner) -> Vec<PlacementRequest> {
    PlacementRequest::initials_on_pages(0..page_count, corner)
}

/// Resolve a request to a stamp rectangle inside `page_box`.
///
/// Stamps that would cross the right or top edge are moved back inside.
pub fn resolve_rect(
    request: &PlacementRequest,
    page_box: &Rect,
    config: &EngineConfig,
) -> Result<Rect> {
    let size = request.stamp_size(config);
    if page_box.width < size.width || page_box.height < size.height {
        return Err(Error::RenderFailure(format!(
            "page area {}x{} is smaller than the {}x{} stamp",
            page_box.width, page_box.height, size.width, size.height
        )));
    }

    if let MarkKind::Initials {
        corner: Some(corner),
    } = request.kind
    {
        let margin = config
            .corner_margin
            .min(page_box.width - size.width)
            .min(page_box.height - size.height)
            .max(0.0);
        let x = match corner {
            Corner::BottomLeft => page_box.x + margin,
            Corner::BottomRight => page_box.right() - size.width - margin,
        };
        return Ok(Rect::new(x, page_box.y + margin, size.width, size.height));
    }

    request.position.validate()?;
    let x = page_box.x + request.position.x * page_box.width;
    let y = page_box.y + request.position.y * page_box.height;
    Ok(Rect::new(
        x.min(page_box.right() - size.width),
        y.min(page_box.top() - size.height),
        size.width,
        size.height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn a4() -> Rect {
        Rect::new(0.0, 0.0, 595.0, 842.0)
    }

    #[test]
    fn test_fractional_position() {
        let config = EngineConfig::default();
        let request = PlacementRequest::signature(0, 0.5, 0.25);
        let rect = resolve_rect(&request, &a4(), &config).unwrap();
        assert_eq!(rect, Rect::new(297.5, 210.5, 150.0, 50.0));
    }

    #[test]
    fn test_overflow_is_clamped() {
        let config = EngineConfig::default();
        let request = PlacementRequest::signature(0, 1.0, 1.0);
        let rect = resolve_rect(&request, &a4(), &config).unwrap();
        assert_eq!(rect, Rect::new(445.0, 792.0, 150.0, 50.0));
    }

    #[test]
    fn test_crop_box_offset_is_respected() {
        let config = EngineConfig::default();
        let cropped = Rect::new(36.0, 36.0, 500.0, 700.0);
        let request = PlacementRequest::signature(0, 0.0, 0.0);
        let rect = resolve_rect(&request, &cropped, &config).unwrap();
        assert_eq!((rect.x, rect.y), (36.0, 36.0));
    }

    #[test]
    fn test_invalid_positions() {
        let config = EngineConfig::default();
        for (x, y) in [(-0.1, 0.5), (0.5, 1.5), (f32::NAN, 0.0), (0.0, f32::INFINITY)] {
            let request = PlacementRequest::signature(0, x, y);
            let err = resolve_rect(&request, &a4(), &config).unwrap_err();
            assert!(matches!(err, Error::RenderFailure(_)));
        }
    }

    #[test]
    fn test_page_smaller_than_stamp() {
        let config = EngineConfig::default();
        let tiny = Rect::new(0.0, 0.0, 100.0, 100.0);
        let request = PlacementRequest::signature(0, 0.0, 0.0);
        assert!(matches!(
            resolve_rect(&request, &tiny, &config),
            Err(Error::RenderFailure(_))
        ));
    }

    #[test]
    fn test_corner_initials() {
        let config = EngineConfig::default();
        let requests = initials_everywhere(2, Corner::BottomRight);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].page, 1);

        let rect = resolve_rect(&requests[0], &a4(), &config).unwrap();
        assert_eq!(rect, Rect::new(525.0, 20.0, 50.0, 35.0));

        let left = PlacementRequest::initials_on_pages([0], Corner::BottomLeft);
        let rect = resolve_rect(&left[0], &a4(), &config).unwrap();
        assert_eq!((rect.x, rect.y), (20.0, 20.0));
    }

    #[test]
    fn test_request_json() {
        let json = r#"[
            {"kind": {"type": "signature"}, "page": 0, "position": {"x": 0.1, "y": 0.2}},
            {"kind": {"type": "initials", "corner": "bottom_right"}, "page": 1, "position": {"x": 0, "y": 0}}
        ]"#;
        let requests: Vec<PlacementRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(requests[0].kind, MarkKind::signature());
        assert_eq!(
            requests[1].kind,
            MarkKind::Initials {
                corner: Some(Corner::BottomRight)
            }
        );
    }

    proptest! {
        #[test]
        fn prop_resolved_rect_stays_on_page(
            x in 0.0f32..=1.0,
            y in 0.0f32..=1.0,
            w in 150.0f32..2000.0,
            h in 50.0f32..2000.0,
            initials in any::<bool>(),
        ) {
            let config = EngineConfig::default();
            let page = Rect::new(10.0, 20.0, w, h);
            let request = if initials {
                PlacementRequest::initials(0, x, y)
            } else {
                PlacementRequest::signature(0, x, y)
            };
            let rect = resolve_rect(&request, &page, &config).unwrap();
            prop_assert!(rect.left() >= page.left() - 1e-3);
            prop_assert!(rect.bottom() >= page.bottom() - 1e-3);
            prop_assert!(rect.right() <= page.right() + 1e-3);
            prop_assert!(rect.top() <= page.top() + 1e-3);
        }
    }
}
