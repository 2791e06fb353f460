// ── Popup placement ───────────────────────────────────────────────────────────
//
// Computes where a popup lands relative to its parent.  All rectangles handed
// to `place_window` are physical screen coordinates carried as f64.
//
// Order of precedence when the default placement does not fit the output
// area: flip (X, then Y, then both), slide, resize.  If nothing fits, the
// default placement is returned unchanged.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// Anchor points on a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Anchor {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    BottomLeft,
    TopRight,
    BottomRight,
}

impl Anchor {
    fn flip_x(self) -> Self {
        match self {
            Self::TopLeft => Self::TopRight,
            Self::TopRight => Self::TopLeft,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::BottomLeft => Self::BottomRight,
            Self::BottomRight => Self::BottomLeft,
            other => other,
        }
    }

    fn flip_y(self) -> Self {
        match self {
            Self::TopLeft => Self::BottomLeft,
            Self::Top => Self::Bottom,
            Self::TopRight => Self::BottomRight,
            Self::BottomLeft => Self::TopLeft,
            Self::Bottom => Self::Top,
            Self::BottomRight => Self::TopRight,
            other => other,
        }
    }

    /// Position of this anchor on `rect`.
    fn position_on(self, rect: &Rect) -> Point {
        let (w, h) = (rect.size.width, rect.size.height);
        let rel = match self {
            Self::TopLeft => Point::new(0.0, 0.0),
            Self::Top => Point::new(w / 2.0, 0.0),
            Self::TopRight => Point::new(w, 0.0),
            Self::Left => Point::new(0.0, h / 2.0),
            Self::Center => Point::new(w / 2.0, h / 2.0),
            Self::Right => Point::new(w, h / 2.0),
            Self::BottomLeft => Point::new(0.0, h),
            Self::Bottom => Point::new(w / 2.0, h),
            Self::BottomRight => Point::new(w, h),
        };
        rect.origin + rel
    }

    /// Offset that moves a child's origin so this anchor sits on the target.
    fn child_offset(self, size: Size) -> Point {
        let (w, h) = (size.width, size.height);
        match self {
            Self::TopLeft => Point::new(0.0, 0.0),
            Self::Top => Point::new(-w / 2.0, 0.0),
            Self::TopRight => Point::new(-w, 0.0),
            Self::Left => Point::new(0.0, -h / 2.0),
            Self::Center => Point::new(-w / 2.0, -h / 2.0),
            Self::Right => Point::new(-w, -h / 2.0),
            Self::BottomLeft => Point::new(0.0, -h),
            Self::Bottom => Point::new(-w / 2.0, -h),
            Self::BottomRight => Point::new(-w, -h),
        }
    }
}

bitflags! {
    /// Adjustments allowed when the popup does not fit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConstraintAdjustment: u32 {
        const SLIDE_X  = 1 << 0;
        const SLIDE_Y  = 1 << 1;
        const FLIP_X   = 1 << 2;
        const FLIP_Y   = 1 << 3;
        const RESIZE_X = 1 << 4;
        const RESIZE_Y = 1 << 5;
        const FLIP_ANY   = Self::FLIP_X.bits() | Self::FLIP_Y.bits();
        const SLIDE_ANY  = Self::SLIDE_X.bits() | Self::SLIDE_Y.bits();
        const RESIZE_ANY = Self::RESIZE_X.bits() | Self::RESIZE_Y.bits();
    }
}

/// How a popup is positioned relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowPositioner {
    /// Anchor rectangle relative to the parent's client area, logical units.
    /// `None` means the parent's whole window rectangle.
    pub anchor_rect: Option<Rect>,
    pub parent_anchor: Anchor,
    pub child_anchor: Anchor,
    /// Offset between the parent anchor and the child anchor.
    pub offset: Point,
    pub constraint_adjustment: ConstraintAdjustment,
}

fn constrain_to(r: &Rect, p: Point) -> Point {
    Point::new(
        p.x.clamp(r.left(), r.right()),
        p.y.clamp(r.top(), r.bottom()),
    )
}

fn flip_offset_x(p: Point) -> Point {
    Point::new(-p.x, p.y)
}

fn flip_offset_y(p: Point) -> Point {
    Point::new(p.x, -p.y)
}

/// Place a child of `child_size` according to `positioner`.
///
/// `anchor_rect` is the resolved anchor rectangle, `parent_rect` the parent's
/// window rectangle and `output_rect` the usable area of the display.
pub fn place_window(
    positioner: &WindowPositioner,
    child_size: Size,
    anchor_rect: &Rect,
    parent_rect: &Rect,
    output_rect: &Rect,
) -> Rect {
    let adjust = positioner.constraint_adjustment;
    let origin_for = |parent_anchor: Anchor, child_anchor: Anchor, offset: Point| {
        constrain_to(parent_rect, parent_anchor.position_on(anchor_rect) + offset)
            + child_anchor.child_offset(child_size)
    };
    let fits = |origin: Point, size: Size| output_rect.contains(&Rect::new(origin, size));

    let default_origin = origin_for(
        positioner.parent_anchor,
        positioner.child_anchor,
        positioner.offset,
    );
    if fits(default_origin, child_size) {
        return Rect::new(default_origin, child_size);
    }

    if adjust.contains(ConstraintAdjustment::FLIP_X) {
        let origin = origin_for(
            positioner.parent_anchor.flip_x(),
            positioner.child_anchor.flip_x(),
            flip_offset_x(positioner.offset),
        );
        if fits(origin, child_size) {
            return Rect::new(origin, child_size);
        }
    }

    if adjust.contains(ConstraintAdjustment::FLIP_Y) {
        let origin = origin_for(
            positioner.parent_anchor.flip_y(),
            positioner.child_anchor.flip_y(),
            flip_offset_y(positioner.offset),
        );
        if fits(origin, child_size) {
            return Rect::new(origin, child_size);
        }
    }

    if adjust.contains(ConstraintAdjustment::FLIP_ANY) {
        let origin = origin_for(
            positioner.parent_anchor.flip_x().flip_y(),
            positioner.child_anchor.flip_x().flip_y(),
            flip_offset_x(flip_offset_y(positioner.offset)),
        );
        if fits(origin, child_size) {
            return Rect::new(origin, child_size);
        }
    }

    // Slide.
    {
        let mut origin = default_origin;
        if adjust.contains(ConstraintAdjustment::SLIDE_X) {
            let left_overhang = origin.x - output_rect.left();
            let right_overhang = origin.x + child_size.width - output_rect.right();
            if left_overhang < 0.0 {
                origin.x -= left_overhang;
            } else if right_overhang > 0.0 {
                origin.x -= right_overhang;
            }
        }
        if adjust.contains(ConstraintAdjustment::SLIDE_Y) {
            let top_overhang = origin.y - output_rect.top();
            let bottom_overhang = origin.y + child_size.height - output_rect.bottom();
            if top_overhang < 0.0 {
                origin.y -= top_overhang;
            } else if bottom_overhang > 0.0 {
                origin.y -= bottom_overhang;
            }
        }
        if fits(origin, child_size) {
            return Rect::new(origin, child_size);
        }
    }

    // Resize.
    {
        let mut origin = default_origin;
        let mut size = child_size;
        if adjust.contains(ConstraintAdjustment::RESIZE_X) {
            let left_overhang = origin.x - output_rect.left();
            let right_overhang = origin.x + size.width - output_rect.right();
            if left_overhang < 0.0 {
                origin.x -= left_overhang;
                size.width += left_overhang;
            }
            if right_overhang > 0.0 {
                size.width -= right_overhang;
            }
        }
        if adjust.contains(ConstraintAdjustment::RESIZE_Y) {
            let top_overhang = origin.y - output_rect.top();
            let bottom_overhang = origin.y + size.height - output_rect.bottom();
            if top_overhang < 0.0 {
                origin.y -= top_overhang;
                size.height += top_overhang;
            }
            if bottom_overhang > 0.0 {
                size.height -= bottom_overhang;
            }
        }
        if fits(origin, size) {
            return Rect::new(origin, size);
        }
    }

    Rect::new(default_origin, child_size)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(Point::new(x, y), Size::new(w, h))
    }

    /// Anchor near the right edge of a 1000×1000 display; a 200×100 child
    /// placed to the right of it overflows by 160px.
    fn overflowing(adjust: ConstraintAdjustment) -> Rect {
        let positioner = WindowPositioner {
            anchor_rect: None,
            parent_anchor: Anchor::TopRight,
            child_anchor: Anchor::TopLeft,
            offset: Point::new(10.0, 0.0),
            constraint_adjustment: adjust,
        };
        let screen = rect(0.0, 0.0, 1000.0, 1000.0);
        place_window(
            &positioner,
            Size::new(200.0, 100.0),
            &rect(900.0, 100.0, 50.0, 20.0),
            &screen,
            &screen,
        )
    }

    #[test]
    fn default_placement_when_it_fits() {
        let positioner = WindowPositioner {
            parent_anchor: Anchor::BottomLeft,
            child_anchor: Anchor::TopLeft,
            ..Default::default()
        };
        let placed = place_window(
            &positioner,
            Size::new(150.0, 100.0),
            &rect(100.0, 100.0, 200.0, 50.0),
            &rect(0.0, 0.0, 800.0, 600.0),
            &rect(0.0, 0.0, 1920.0, 1080.0),
        );
        assert_eq!(placed, rect(100.0, 150.0, 150.0, 100.0));
    }

    #[test]
    fn flip_x_mirrors_anchors_and_offset() {
        assert_eq!(overflowing(ConstraintAdjustment::FLIP_X), rect(690.0, 100.0, 200.0, 100.0));
    }

    #[test]
    fn slide_x_pulls_back_inside() {
        assert_eq!(overflowing(ConstraintAdjustment::SLIDE_X), rect(800.0, 100.0, 200.0, 100.0));
    }

    #[test]
    fn resize_x_trims_the_overhang() {
        assert_eq!(overflowing(ConstraintAdjustment::RESIZE_X), rect(960.0, 100.0, 40.0, 100.0));
    }

    #[test]
    fn no_adjustment_keeps_the_default() {
        assert_eq!(overflowing(ConstraintAdjustment::empty()), rect(960.0, 100.0, 200.0, 100.0));
    }

    #[test]
    fn flip_takes_precedence_over_slide() {
        let both = ConstraintAdjustment::FLIP_X | ConstraintAdjustment::SLIDE_X;
        assert_eq!(overflowing(both), rect(690.0, 100.0, 200.0, 100.0));
    }
}
