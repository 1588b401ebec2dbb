//! Geometric primitives in PDF user space.
//!
//! Unlike screen coordinates, PDF user space has its origin at the bottom-left
//! corner of the page and y grows upwards. A [`Rect`] is stored as its
//! lower-left corner plus a width and height.

use lopdf::Object;

/// A rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f32,
    /// Y coordinate of the lower-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from its lower-left corner and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_countersign::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 150.0, 50.0);
    /// assert_eq!(rect.right(), 150.0);
    /// assert_eq!(rect.top(), 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    ///
    /// PDF rectangles (`/MediaBox`, `/Rect`) are allowed to list their corners
    /// in either order, so the result is normalized.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_countersign::geometry::Rect;
    ///
    /// let rect = Rect::from_points(612.0, 792.0, 0.0, 0.0);
    /// assert_eq!(rect, Rect::new(0.0, 0.0, 612.0, 792.0));
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Parse a PDF rectangle array `[llx lly urx ury]`.
    pub fn from_pdf_array(values: &[Object]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let mut nums = [0.0f32; 4];
        for (slot, value) in nums.iter_mut().zip(values) {
            *slot = match value {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r,
                _ => return None,
            };
        }
        Some(Self::from_points(nums[0], nums[1], nums[2], nums[3]))
    }

    /// Convert to a PDF rectangle array `[llx lly urx ury]`.
    pub fn to_pdf_array(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.x),
            Object::Real(self.y),
            Object::Real(self.right()),
            Object::Real(self.top()),
        ])
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Check if this rectangle lies entirely within `outer`.
    pub fn is_inside(&self, outer: &Rect) -> bool {
        self.left() >= outer.left()
            && self.bottom() >= outer.bottom()
            && self.right() <= outer.right()
            && self.top() <= outer.top()
    }

    /// Intersection of two rectangles, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.left().max(other.left());
        let y0 = self.bottom().max(other.bottom());
        let x1 = self.right().min(other.right());
        let y1 = self.top().min(other.top());
        if x1 > x0 && y1 > y0 {
            Some(Rect::from_points(x0, y0, x1, y1))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pdf_array_mixed_numbers() {
        let arr = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(595.28),
            Object::Integer(842),
        ];
        let rect = Rect::from_pdf_array(&arr).unwrap();
        assert_eq!(rect.width, 595.28);
        assert_eq!(rect.height, 842.0);
    }

    #[test]
    fn test_from_pdf_array_rejects_wrong_length() {
        assert!(Rect::from_pdf_array(&[Object::Integer(0)]).is_none());
        assert!(Rect::from_pdf_array(&[
            Object::Integer(0),
            Object::Integer(0),
            Object::Name(b"X".to_vec()),
            Object::Integer(1)
        ])
        .is_none());
    }

    #[test]
    fn test_is_inside() {
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        assert!(Rect::new(10.0, 10.0, 150.0, 50.0).is_inside(&page));
        assert!(!Rect::new(500.0, 10.0, 150.0, 50.0).is_inside(&page));
    }

    #[test]
    fn test_intersection() {
        let media = Rect::new(0.0, 0.0, 612.0, 792.0);
        let crop = Rect::new(36.0, 36.0, 1000.0, 1000.0);
        let visible = media.intersection(&crop).unwrap();
        assert_eq!(visible, Rect::from_points(36.0, 36.0, 612.0, 792.0));

        let far = Rect::new(700.0, 800.0, 10.0, 10.0);
        assert!(media.intersection(&far).is_none());
    }
}
