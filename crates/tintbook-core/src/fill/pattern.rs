//! Procedural pattern textures for pattern fills.

use crate::action::{Color, PatternKind};
use image::Rgba;

/// Side length of one pattern cell in pixels.
const CELL: u32 = 16;

/// Texture pixel at `(x, y)` for a pattern drawn in `color`.
///
/// Marks are drawn in `color` over a pale tint of it, so a patterned region
/// stays recognisably the chosen color.
pub fn pattern_pixel(kind: PatternKind, color: Color, x: u32, y: u32) -> Rgba<u8> {
    if is_mark(kind, x, y) {
        Rgba(color.to_rgba())
    } else {
        Rgba(tint(color, 0.7).to_rgba())
    }
}

fn is_mark(kind: PatternKind, x: u32, y: u32) -> bool {
    // Cell-local coordinates in [-1, 1].
    let u = ((x % CELL) as f32 + 0.5) / CELL as f32 * 2.0 - 1.0;
    let v = ((y % CELL) as f32 + 0.5) / CELL as f32 * 2.0 - 1.0;

    match kind {
        PatternKind::Dots => u * u + v * v <= 0.3,
        PatternKind::Stripes => (x + y) % 8 < 3,
        PatternKind::Checker => ((x / (CELL / 2)) + (y / (CELL / 2))) % 2 == 0,
        PatternKind::Hearts => {
            // Implicit heart curve, flipped so the point faces down.
            let (hu, hv) = (u * 1.3, -v * 1.3 + 0.2);
            let a = hu * hu + hv * hv - 1.0;
            a * a * a - hu * hu * hv * hv * hv <= 0.0
        }
        PatternKind::Stars => {
            let (au, av) = (u.abs(), v.abs());
            au + av <= 0.45 || ((au < 0.1 || av < 0.1) && au.max(av) < 0.85)
        }
    }
}

/// Blend `color` toward white by `amount` (0 = unchanged, 1 = white).
fn tint(color: Color, amount: f32) -> Color {
    let mix = |c: u8| (c as f32 + (255.0 - c as f32) * amount).round() as u8;
    Color::new(mix(color.r), mix(color.g), mix(color.b), color.a)
}
