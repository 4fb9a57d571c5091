//! Viewport-space geometry: rectangles as reported by `getBoundingClientRect`.

use serde::{Deserialize, Serialize};

/// A point in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Same rectangle moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Vertical band overlap: `self.bottom > other.top && self.top < other.bottom`.
    ///
    /// This is the test used for the navbar over a full-width section, where the
    /// horizontal extent never matters.
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.bottom() > other.top && self.top < other.bottom()
    }

    /// Inclusive intersection test. Touching edges count, matching
    /// `!(rect.bottom < 0 || rect.top > innerHeight)` for a full-width viewport.
    pub fn touches(&self, other: &Rect) -> bool {
        !(self.bottom() < other.top
            || self.top > other.bottom()
            || self.right() < other.left
            || self.left > other.right())
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > left && bottom > top {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Fraction of this rectangle's area inside `viewport`, in `[0, 1]`.
    ///
    /// A zero-area rectangle counts as fully visible while it touches the
    /// viewport, like `IntersectionObserver` reports for empty targets.
    pub fn visible_fraction(&self, viewport: &Rect) -> f64 {
        let area = self.area();
        if area == 0.0 {
            return if self.touches(viewport) { 1.0 } else { 0.0 };
        }
        self.intersection(viewport)
            .map(|r| (r.area() / area).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), Point::new(25.0, 40.0));
    }

    #[test]
    fn test_vertical_overlap() {
        let nav = Rect::new(0.0, 0.0, 1000.0, 60.0);
        assert!(nav.overlaps_vertically(&Rect::new(0.0, 30.0, 1000.0, 500.0)));
        assert!(nav.overlaps_vertically(&Rect::new(0.0, -400.0, 1000.0, 450.0)));
        // Touching is not overlapping
        assert!(!nav.overlaps_vertically(&Rect::new(0.0, 60.0, 1000.0, 500.0)));
        assert!(!nav.overlaps_vertically(&Rect::new(0.0, -500.0, 1000.0, 500.0)));
    }

    #[test]
    fn test_touches_is_inclusive() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert!(Rect::new(0.0, 600.0, 800.0, 100.0).touches(&viewport));
        assert!(Rect::new(0.0, -100.0, 800.0, 100.0).touches(&viewport));
        assert!(!Rect::new(0.0, 600.5, 800.0, 100.0).touches(&viewport));
        assert!(!Rect::new(0.0, -100.5, 800.0, 100.0).touches(&viewport));
    }

    #[test]
    fn test_visible_fraction() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        let half = Rect::new(0.0, 500.0, 800.0, 200.0);
        assert!((half.visible_fraction(&viewport) - 0.5).abs() < EPSILON);
        let inside = Rect::new(100.0, 100.0, 50.0, 50.0);
        assert!((inside.visible_fraction(&viewport) - 1.0).abs() < EPSILON);
        let below = Rect::new(0.0, 700.0, 800.0, 200.0);
        assert_eq!(below.visible_fraction(&viewport), 0.0);
    }

    #[test]
    fn test_empty_rect_fraction() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(Rect::new(10.0, 10.0, 0.0, 0.0).visible_fraction(&viewport), 1.0);
        assert_eq!(Rect::new(10.0, 900.0, 0.0, 0.0).visible_fraction(&viewport), 0.0);
    }

    #[test]
    fn test_distance() {
        assert!((Point::new(0.0, 0.0).distance_to(Point::new(3.0, 4.0)) - 5.0).abs() < EPSILON);
    }
}
