// ── DPI conversion ────────────────────────────────────────────────────────────
//
// Pure arithmetic between logical units (96 DPI reference) and device pixels.
// Querying the DPI of a window or monitor is the platform's job; see
// `Platform::dpi_for_window`.

use crate::geometry::{PhysicalSize, Size};

pub const BASE_DPI: u32 = 96;

/// Scale a pixel value defined at 96 DPI to `dpi`.
pub fn scale(px: i32, dpi: u32) -> i32 {
    px * dpi as i32 / BASE_DPI as i32
}

/// Device pixels per logical unit at `dpi`.
pub fn scale_factor(dpi: u32) -> f64 {
    f64::from(dpi) / f64::from(BASE_DPI)
}

/// Logical size → device pixels, rounded to the nearest pixel.
pub fn to_physical(size: Size, dpi: u32) -> PhysicalSize {
    let factor = scale_factor(dpi);
    PhysicalSize::new(
        (size.width * factor).round() as i32,
        (size.height * factor).round() as i32,
    )
}

/// Device pixels → logical size.
pub fn to_logical(size: PhysicalSize, dpi: u32) -> Size {
    let factor = scale_factor(dpi);
    Size::new(
        f64::from(size.width) / factor,
        f64::from(size.height) / factor,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_at_base_dpi_is_identity() {
        assert_eq!(scale(31, BASE_DPI), 31);
        assert_eq!(scale(8, 144), 12);
    }

    #[test]
    fn physical_round_trip_at_150_percent() {
        let logical = Size::new(800.0, 600.0);
        let physical = to_physical(logical, 144);
        assert_eq!(physical, PhysicalSize::new(1200, 900));
        assert_eq!(to_logical(physical, 144), logical);
    }

    #[test]
    fn fractional_logical_sizes_round_to_nearest_pixel() {
        // 333 × 1.25 = 416.25
        assert_eq!(to_physical(Size::new(333.0, 2.0), 120), PhysicalSize::new(416, 3));
    }
}
