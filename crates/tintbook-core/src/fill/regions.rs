//! Full-image region enumeration for automated color assignment.

use super::BoundaryRule;
use super::flood::{UNCLAIMED, scanline_fill};
use image::RgbaImage;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Inclusive pixel bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// A connected fillable area of a line-art image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: usize,
    pub bounds: PixelBounds,
    /// A pixel inside the region, usable as a fill seed.
    pub centroid: Point,
    pub pixel_count: usize,
}

/// Tunables for [`enumerate_regions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOptions {
    pub rule: BoundaryRule,
    /// Spacing of the coarse seed grid in pixels.
    pub grid_step: u32,
    /// Regions smaller than this are treated as noise and dropped.
    pub min_region_size: usize,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            rule: BoundaryRule::default(),
            grid_step: 4,
            min_region_size: 50,
        }
    }
}

/// Find every fillable region of `image` reachable from the seed grid.
///
/// Each unclaimed grid pixel floods its whole region. Undersized regions are
/// discarded but stay claimed, so they are not rediscovered from another
/// grid point. Regions are numbered in discovery order.
pub fn enumerate_regions(image: &RgbaImage, options: &RegionOptions) -> Vec<Region> {
    let (width, height) = image.dimensions();
    let step = options.grid_step.max(1) as usize;
    let rule = options.rule;
    let mut labels = vec![UNCLAIMED; width as usize * height as usize];
    let mut next_label = UNCLAIMED;
    let mut regions = Vec::new();
    let mut discarded = 0usize;

    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            let idx = y as usize * width as usize + x as usize;
            if labels[idx] != UNCLAIMED || rule.is_boundary(image.get_pixel(x, y)) {
                continue;
            }

            next_label += 1;
            let mut bounds = PixelBounds::at(x, y);
            let (mut sum_x, mut sum_y) = (0u64, 0u64);
            let count = scanline_fill(
                width,
                height,
                (x, y),
                &mut labels,
                next_label,
                |px, py| !rule.is_boundary(image.get_pixel(px, py)),
                |px, py| {
                    bounds.include(px, py);
                    sum_x += px as u64;
                    sum_y += py as u64;
                },
            );

            if count < options.min_region_size {
                discarded += 1;
                continue;
            }

            let mean = Point::new(sum_x as f64 / count as f64, sum_y as f64 / count as f64);
            let centroid = member_nearest(&labels, width, &bounds, next_label, mean);
            regions.push(Region {
                id: regions.len(),
                bounds,
                centroid,
                pixel_count: count,
            });
        }
    }

    log::info!(
        "Found {} regions in {}x{} image ({} below {} px discarded)",
        regions.len(),
        width,
        height,
        discarded,
        options.min_region_size
    );
    regions
}

/// The region pixel closest to `mean`, or `mean`'s own pixel if it is a member.
///
/// Concave regions, or ones wrapping around a foreground shape, often have
/// a mean outside themselves; the result is always a valid seed.
fn member_nearest(labels: &[u32], width: u32, bounds: &PixelBounds, label: u32, mean: Point) -> Point {
    let w = width as usize;
    let (rx, ry) = (mean.x.round() as u32, mean.y.round() as u32);
    if labels[ry as usize * w + rx as usize] == label {
        return Point::new(rx as f64, ry as f64);
    }

    let mut best = (f64::MAX, Point::new(bounds.min_x as f64, bounds.min_y as f64));
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            if labels[y as usize * w + x as usize] != label {
                continue;
            }
            let p = Point::new(x as f64, y as f64);
            let d = (p - mean).hypot2();
            if d < best.0 {
                best = (d, p);
            }
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn from_rows(rows: &[&str]) -> RgbaImage {
        RgbaImage::from_fn(rows[0].len() as u32, rows.len() as u32, |x, y| {
            if rows[y as usize].as_bytes()[x as usize] == b'#' { INK } else { PAPER }
        })
    }

    fn is_member(image: &RgbaImage, region: &Region) -> bool {
        let (x, y) = (region.centroid.x as u32, region.centroid.y as u32);
        !BoundaryRule::default().is_boundary(image.get_pixel(x, y))
            && (region.bounds.min_x..=region.bounds.max_x).contains(&x)
            && (region.bounds.min_y..=region.bounds.max_y).contains(&y)
    }

    #[test]
    fn test_two_boxes() {
        // 40x20 canvas split by a vertical wall at x = 20.
        let image = RgbaImage::from_fn(40, 20, |x, _| if x == 20 { INK } else { PAPER });
        let options = RegionOptions { min_region_size: 10, ..Default::default() };

        let regions = enumerate_regions(&image, &options);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].pixel_count, 400);
        assert_eq!(regions[1].pixel_count, 19 * 20);
        assert_eq!(regions[0].bounds, PixelBounds { min_x: 0, min_y: 0, max_x: 19, max_y: 19 });
        assert_eq!(regions[1].bounds.min_x, 21);
        assert_eq!(regions[0].centroid, Point::new(10.0, 10.0));
        assert_eq!(regions.iter().map(|r| r.id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_small_regions_rejected() {
        let image = from_rows(&[
            "................",
            "................",
            "..####..........",
            "..#..#..........",
            "..#..#..........",
            "..####..........",
            "................",
            "................",
        ]);
        let options = RegionOptions { grid_step: 1, min_region_size: 10, ..Default::default() };

        let regions = enumerate_regions(&image, &options);
        assert_eq!(regions.len(), 1);
        assert!(regions.iter().all(|r| r.pixel_count >= options.min_region_size));
        assert_eq!(regions[0].pixel_count, 16 * 8 - 16);
    }

    #[test]
    fn test_concave_region_centroid_is_member() {
        // A ring: the mean of the outer region lies in the inner box.
        let image = RgbaImage::from_fn(30, 30, |x, y| {
            let edge = (x == 10 || x == 19) && (10..=19).contains(&y) || (y == 10 || y == 19) && (10..=19).contains(&x);
            if edge { INK } else { PAPER }
        });
        let options = RegionOptions { grid_step: 3, min_region_size: 20, ..Default::default() };

        let regions = enumerate_regions(&image, &options);
        assert_eq!(regions.len(), 2);

        let ring = &regions[0];
        assert_eq!(ring.pixel_count, 900 - 100);
        assert!(is_member(&image, ring));
        let (cx, cy) = (ring.centroid.x as u32, ring.centroid.y as u32);
        assert!(!(10..=19).contains(&cx) || !(10..=19).contains(&cy), "centroid inside the hole");

        let inner = &regions[1];
        assert_eq!(inner.pixel_count, 64);
        assert!(is_member(&image, inner));
    }

    #[test]
    fn test_all_ink_has_no_regions() {
        let image = RgbaImage::from_pixel(8, 8, INK);
        assert!(enumerate_regions(&image, &RegionOptions::default()).is_empty());
    }
}
