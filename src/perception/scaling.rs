//! Linear coordinate scaling between two resolution spaces.
//!
//! The model reasons in a fixed virtual resolution (e.g. 1280×800) while
//! input injection and capture happen in physical screen pixels. Both
//! directions use the same pure transform.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A point expressed in the target resolution of a [`scale_point`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaledPoint {
    pub x: i32,
    pub y: i32,
}

/// Map (x, y) from `from` into `to`, rounding to the nearest pixel.
///
/// Pure and stateless; scaling a point and then inverse-scaling with the
/// resolutions swapped lands within one pixel of the original.
pub fn scale_point(x: i32, y: i32, from: Resolution, to: Resolution) -> ScaledPoint {
    debug_assert!(from.width > 0 && from.height > 0);
    let sx = (x as f64 * to.width as f64 / from.width as f64).round() as i32;
    let sy = (y as f64 * to.height as f64 / from.height as f64).round() as i32;
    ScaledPoint { x: sx, y: sy }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_click_maps_to_full_target() {
        let p = scale_point(
            1920,
            1080,
            Resolution::new(1920, 1080),
            Resolution::new(1280, 800),
        );
        assert_eq!(p, ScaledPoint { x: 1280, y: 800 });
    }

    #[test]
    fn origin_is_fixed() {
        let p = scale_point(
            0,
            0,
            Resolution::new(2560, 1440),
            Resolution::new(1280, 800),
        );
        assert_eq!(p, ScaledPoint { x: 0, y: 0 });
    }

    #[test]
    fn rounds_to_nearest_pixel() {
        // 100 * 1280 / 1920 = 66.67, 100 * 800 / 1080 = 74.07
        let p = scale_point(
            100,
            100,
            Resolution::new(1920, 1080),
            Resolution::new(1280, 800),
        );
        assert_eq!(p, ScaledPoint { x: 67, y: 74 });
    }

    #[test]
    fn round_trip_stays_within_one_pixel() {
        let cases = [
            (Resolution::new(1920, 1080), Resolution::new(1280, 800)),
            (Resolution::new(2560, 1440), Resolution::new(1280, 800)),
            (Resolution::new(3840, 2160), Resolution::new(1366, 768)),
            (Resolution::new(1280, 800), Resolution::new(1920, 1080)),
            (Resolution::new(1440, 900), Resolution::new(1024, 768)),
        ];
        for (from, to) in cases {
            for (x, y) in [(0, 0), (17, 43), (640, 400), (1279, 799), (1, 1)] {
                let there = scale_point(x, y, from, to);
                let back = scale_point(there.x, there.y, to, from);
                assert!(
                    (back.x - x).abs() <= 1 && (back.y - y).abs() <= 1,
                    "({x},{y}) {from} -> {to}: came back as ({},{})",
                    back.x,
                    back.y,
                );
            }
        }
    }
}
