// ── Geometry ──────────────────────────────────────────────────────────────────
//
// Logical types (`Size`, `Point`, `Rect`) are DPI-independent and carried as
// f64.  Physical types mirror Win32's integer `SIZE`/`POINT`/`RECT` in device
// pixels of the monitor the window currently sits on.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

// ── Logical ───────────────────────────────────────────────────────────────────

/// A size in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Clamp each dimension into `[min, max]`, ignoring absent bounds.
    pub fn clamp(self, min: Option<Size>, max: Option<Size>) -> Self {
        let mut out = self;
        if let Some(min) = min {
            out.width = out.width.max(min.width);
            out.height = out.height.max(min.height);
        }
        if let Some(max) = max {
            out.width = out.width.min(max.width);
            out.height = out.height.min(max.height);
        }
        out
    }
}

/// A point (or offset) in logical or physical units, as f64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned rectangle given by origin and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn left(&self) -> f64 {
        self.origin.x
    }

    pub fn top(&self) -> f64 {
        self.origin.y
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// `true` when `other` lies entirely inside `self` (edges may touch).
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

// ── Physical ──────────────────────────────────────────────────────────────────

/// A size in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PhysicalSize {
    pub width: i32,
    pub height: i32,
}

impl PhysicalSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A point in device pixels, usually in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PhysicalPoint {
    pub x: i32,
    pub y: i32,
}

impl PhysicalPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A Win32-style rectangle: `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PhysicalRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PhysicalRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Edges saturate at the `i32` range.
    pub fn from_origin_size(origin: PhysicalPoint, size: PhysicalSize) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x.saturating_add(size.width),
            origin.y.saturating_add(size.height),
        )
    }

    pub fn origin(&self) -> PhysicalPoint {
        PhysicalPoint::new(self.left, self.top)
    }

    pub fn size(&self) -> PhysicalSize {
        PhysicalSize::new(
            self.right.saturating_sub(self.left),
            self.bottom.saturating_sub(self.top),
        )
    }

    /// The same rectangle in f64, for placement arithmetic.
    pub fn to_rect(&self) -> Rect {
        let size = self.size();
        Rect::new(
            Point::new(f64::from(self.left), f64::from(self.top)),
            Size::new(f64::from(size.width), f64::from(size.height)),
        )
    }

    /// Round an f64 rectangle back onto the pixel grid.
    pub fn from_rect(rect: &Rect) -> Self {
        let left = rect.left().round() as i32;
        let top = rect.top().round() as i32;
        Self::new(
            left,
            top,
            left.saturating_add(rect.size.width.round() as i32),
            top.saturating_add(rect.size.height.round() as i32),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_both_bounds() {
        let s = Size::new(50.0, 900.0);
        let clamped = s.clamp(Some(Size::new(100.0, 100.0)), Some(Size::new(800.0, 600.0)));
        assert_eq!(clamped, Size::new(100.0, 600.0));
    }

    #[test]
    fn clamp_without_bounds_is_identity() {
        let s = Size::new(12.5, 7.0);
        assert_eq!(s.clamp(None, None), s);
    }

    #[test]
    fn non_positive_or_nan_sizes_are_rejected() {
        assert!(Size::new(1.0, 1.0).is_positive());
        assert!(!Size::new(0.0, 1.0).is_positive());
        assert!(!Size::new(1.0, -3.0).is_positive());
        assert!(!Size::new(f64::NAN, 1.0).is_positive());
    }

    #[test]
    fn contains_allows_touching_edges() {
        let outer = Rect::new(Point::new(0.0, 0.0), Size::new(100.0, 100.0));
        let inner = Rect::new(Point::new(50.0, 50.0), Size::new(50.0, 50.0));
        let spill = Rect::new(Point::new(51.0, 50.0), Size::new(50.0, 50.0));
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&spill));
    }

    #[test]
    fn physical_rect_origin_and_size() {
        let r = PhysicalRect::from_origin_size(PhysicalPoint::new(10, 20), PhysicalSize::new(300, 200));
        assert_eq!(r, PhysicalRect::new(10, 20, 310, 220));
        assert_eq!(r.size(), PhysicalSize::new(300, 200));
        assert_eq!(PhysicalRect::from_rect(&r.to_rect()), r);
    }

    #[test]
    fn physical_rect_edges_saturate() {
        let r = PhysicalRect::from_origin_size(PhysicalPoint::new(100, -5), PhysicalSize::new(i32::MAX, 10));
        assert_eq!(r.right, i32::MAX);
        assert_eq!(r.size().width, i32::MAX - 100);
        let wide = Rect::new(Point::new(10.0, 0.0), Size::new(3e9, 20.0));
        assert_eq!(PhysicalRect::from_rect(&wide).right, i32::MAX);
    }
}
