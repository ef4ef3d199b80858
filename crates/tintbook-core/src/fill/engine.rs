//! Interactive bucket fill over a drawing layer and a line-art layer.

use super::flood::{UNCLAIMED, scanline_fill};
use super::pattern::pattern_pixel;
use super::{BoundaryRule, color_distance};
use crate::action::{Color, Fill, FillKind, MagicFill, PatternKind};
use image::{Rgba, RgbaImage, imageops};
use kurbo::Point;

/// Default per-channel tolerance when matching the seed color.
pub const DEFAULT_TOLERANCE: u8 = 32;

/// Tunables for the bucket tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillOptions {
    pub rule: BoundaryRule,
    /// Largest per-channel difference from the seed color that still fills.
    pub tolerance: u8,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            rule: BoundaryRule::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Merge the drawing layer with the line art.
///
/// The drawing is laid over the line art and every line-art boundary pixel is
/// then stamped back on top. Fills match colors on this buffer, so existing
/// paint of a different color also stops them.
pub fn composite_boundary(drawing: &RgbaImage, line_art: &RgbaImage, rule: &BoundaryRule) -> RgbaImage {
    let mut composite = line_art.clone();
    imageops::overlay(&mut composite, drawing, 0, 0);
    for (x, y, pixel) in line_art.enumerate_pixels() {
        if rule.is_boundary(pixel) {
            composite.put_pixel(x, y, *pixel);
        }
    }
    composite
}

/// Bucket fill tool.
#[derive(Debug, Clone, Default)]
pub struct FillEngine {
    options: FillOptions,
}

impl FillEngine {
    pub fn new(options: FillOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    /// Apply `fill` to `drawing`, bounded by `line_art` and existing paint.
    ///
    /// `fill.at` is in raster pixel space. Only line-art pixels are
    /// boundaries; paint on the drawing layer bounds a fill through the color
    /// tolerance alone, so a painted region can always be refilled. Returns
    /// false, leaving `drawing` untouched, when the layers differ in size or
    /// the seed is out of range or on the outline.
    pub fn fill(&self, drawing: &mut RgbaImage, line_art: &RgbaImage, fill: &Fill) -> bool {
        if drawing.dimensions() != line_art.dimensions() {
            log::warn!(
                "Drawing layer is {:?} but line art is {:?}, skipping fill",
                drawing.dimensions(),
                line_art.dimensions()
            );
            return false;
        }
        let Some(seed) = self.seed_pixel(line_art, fill.at) else {
            log::debug!("Fill seed {:?} is not fillable", fill.at);
            return false;
        };
        let composite = composite_boundary(drawing, line_art, &self.options.rule);
        let layers = Layers {
            composite: &composite,
            line_art,
        };

        match (fill.kind, fill.pattern) {
            (FillKind::Pattern, Some(pattern)) => {
                self.fill_pattern(drawing, layers, seed, fill.color, pattern);
            }
            (FillKind::Pattern, None) => {
                log::debug!("Pattern fill without a pattern, painting solid");
                self.fill_solid(drawing, layers, seed, fill.color);
            }
            (FillKind::Solid, _) => {
                self.fill_solid(drawing, layers, seed, fill.color);
            }
        }
        true
    }

    /// Replay a magic fill batch. Returns how many entries filled something.
    pub fn apply_magic_fill(&self, drawing: &mut RgbaImage, line_art: &RgbaImage, magic: &MagicFill) -> usize {
        magic
            .entries
            .iter()
            .filter(|entry| self.fill(drawing, line_art, &Fill::solid(entry.color, entry.point())))
            .count()
    }

    /// Pixel under `at` if it is in range and not on the outline.
    fn seed_pixel(&self, line_art: &RgbaImage, at: Point) -> Option<(u32, u32)> {
        if !at.x.is_finite() || !at.y.is_finite() || at.x < 0.0 || at.y < 0.0 {
            return None;
        }
        let (x, y) = (at.x.floor() as u32, at.y.floor() as u32);
        if x >= line_art.width() || y >= line_art.height() {
            return None;
        }
        if self.options.rule.is_boundary(line_art.get_pixel(x, y)) {
            return None;
        }
        Some((x, y))
    }

    fn fill_solid(&self, drawing: &mut RgbaImage, layers: Layers<'_>, seed: (u32, u32), color: Color) {
        let paint = Rgba(color.to_rgba());
        let count = self.flood(layers, seed, |x, y| drawing.put_pixel(x, y, paint));
        log::debug!("Solid fill painted {} pixels", count);
    }

    /// Pattern fill. The flood reads the composite only, so texels go straight
    /// onto the drawing without feeding back into the tolerance test.
    fn fill_pattern(
        &self,
        drawing: &mut RgbaImage,
        layers: Layers<'_>,
        seed: (u32, u32),
        color: Color,
        pattern: PatternKind,
    ) {
        let count = self.flood(layers, seed, |x, y| {
            drawing.put_pixel(x, y, pattern_pixel(pattern, color, x, y))
        });
        log::debug!("Pattern fill painted {} pixels", count);
    }

    fn flood<V>(&self, layers: Layers<'_>, seed: (u32, u32), visit: V) -> usize
    where
        V: FnMut(u32, u32),
    {
        let Layers { composite, line_art } = layers;
        let (width, height) = composite.dimensions();
        let target = *composite.get_pixel(seed.0, seed.1);
        let rule = self.options.rule;
        let tolerance = self.options.tolerance;
        let mut labels = vec![UNCLAIMED; width as usize * height as usize];

        scanline_fill(
            width,
            height,
            seed,
            &mut labels,
            1,
            |x, y| {
                !rule.is_boundary(line_art.get_pixel(x, y))
                    && color_distance(composite.get_pixel(x, y), &target) <= tolerance
            },
            visit,
        )
    }
}

/// Same-sized buffers a flood reads from.
#[derive(Clone, Copy)]
struct Layers<'a> {
    composite: &'a RgbaImage,
    line_art: &'a RgbaImage,
}
