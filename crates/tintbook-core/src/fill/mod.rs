//! Boundary-aware flood fill and region detection on raster buffers.
//!
//! Line art is classified pixel by pixel: dark, sufficiently opaque pixels are
//! boundaries that no fill may cross. The same scanline flood fill powers the
//! interactive bucket tool and the offline region enumerator.

mod engine;
mod flood;
mod pattern;
mod regions;

pub use engine::{FillEngine, FillOptions, composite_boundary};
pub use pattern::pattern_pixel;
pub use regions::{PixelBounds, Region, RegionOptions, enumerate_regions};

use image::Rgba;

/// Default minimum alpha for a pixel to count as line art.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// Default luminance below which an opaque pixel counts as line art.
pub const DEFAULT_LUMINANCE_THRESHOLD: f32 = 100.0;

/// Classifies pixels as boundary (line art) or fillable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryRule {
    pub alpha_threshold: u8,
    pub luminance_threshold: f32,
}

impl Default for BoundaryRule {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            luminance_threshold: DEFAULT_LUMINANCE_THRESHOLD,
        }
    }
}

impl BoundaryRule {
    /// Whether the pixel is an outline that stops a fill.
    #[inline]
    pub fn is_boundary(&self, pixel: &Rgba<u8>) -> bool {
        pixel[3] >= self.alpha_threshold && luminance(pixel) < self.luminance_threshold
    }
}

/// Perceptual luminance of a pixel, ignoring alpha.
#[inline]
pub fn luminance(pixel: &Rgba<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

/// Largest per-channel difference between two pixels.
#[inline]
pub fn color_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> u8 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_classification() {
        let rule = BoundaryRule::default();
        assert!(rule.is_boundary(&Rgba([0, 0, 0, 255])));
        assert!(rule.is_boundary(&Rgba([60, 60, 60, 200])));
        // Transparent ink is not a boundary.
        assert!(!rule.is_boundary(&Rgba([0, 0, 0, 0])));
        assert!(!rule.is_boundary(&Rgba([0, 0, 0, 127])));
        // Light colors are fillable.
        assert!(!rule.is_boundary(&Rgba([255, 255, 255, 255])));
        assert!(!rule.is_boundary(&Rgba([255, 200, 0, 255])));
        // Saturated blue is dark by luminance.
        assert!(rule.is_boundary(&Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance(&Rgba([10, 20, 30, 255]), &Rgba([10, 20, 30, 255])), 0);
        assert_eq!(color_distance(&Rgba([10, 20, 30, 255]), &Rgba([15, 0, 31, 250])), 20);
    }
}
