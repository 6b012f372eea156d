use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page-local coordinates.
///
/// Origin is the top-left corner of the page and y grows downward, matching
/// how pages are rendered. `left <= right` and `top <= bottom` always hold for
/// rectangles built through [`Rect::new`] or [`Rect::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Build a rectangle from two opposite corners, in any order.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Rect {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Tightest rectangle enclosing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Union of a set of rectangles. `None` for an empty set.
    pub fn union_all<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }

    /// Scale every coordinate by `factor` (e.g. raster pixels to page points).
    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(
            self.left * factor,
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let r = Rect::new(30.0, 40.0, 10.0, 20.0);
        assert_eq!(r, Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(r.width(), 20.0);
        assert_eq!(r.height(), 20.0);
    }

    #[test]
    fn test_union_all() {
        let rects = [
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Rect::new(5.0, 15.0, 12.0, 30.0),
            Rect::new(18.0, 8.0, 40.0, 12.0),
        ];
        let u = Rect::union_all(&rects).unwrap();
        assert_eq!(u, Rect::new(5.0, 8.0, 40.0, 30.0));
        assert_eq!(u.center(), (22.5, 19.0));
    }

    #[test]
    fn test_union_all_empty() {
        assert!(Rect::union_all(&[]).is_none());
    }

    #[test]
    fn test_scaled() {
        let r = Rect::new(0.0, 100.0, 300.0, 150.0).scaled(0.24);
        assert!((r.right - 72.0).abs() < 1e-4);
        assert!((r.top - 24.0).abs() < 1e-4);
    }
}
