//! Per-action coordinate normalization.
//!
//! The raster renderer records coordinates in on-screen layout units while the
//! vector renderer records them in the line-art's intrinsic units. Before an
//! action is replayed it is rescaled from its own source space into the
//! target canvas space. Each action is handled on its own, so one history can
//! mix actions authored on different devices.

use crate::action::{Action, ActionKind};
use kurbo::{Affine, Point, Size};

/// Scale factors within this distance of 1.0 are treated as identity.
pub const SCALE_EPSILON: f64 = 0.01;

/// Per-axis scale between two coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    /// Factors mapping `source` onto `target`, or `None` if either size is degenerate.
    pub fn between(source: Size, target: Size) -> Option<Self> {
        let valid = |s: Size| s.width.is_finite() && s.height.is_finite() && s.width > 0.0 && s.height > 0.0;
        if !valid(source) || !valid(target) {
            return None;
        }
        Some(Self {
            x: target.width / source.width,
            y: target.height / source.height,
        })
    }

    /// Whether both axes are close enough to 1.0 to skip rescaling.
    pub fn is_identity(&self) -> bool {
        (self.x - 1.0).abs() <= SCALE_EPSILON && (self.y - 1.0).abs() <= SCALE_EPSILON
    }

    /// Factor for size-like scalars (stroke width, sticker size).
    pub fn uniform(&self) -> f64 {
        self.x.min(self.y)
    }

    pub fn point(&self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }

    pub fn affine(&self) -> Affine {
        Affine::scale_non_uniform(self.x, self.y)
    }
}

/// Rescale `action` into `target` space.
///
/// Returns true if the action was transformed. On transform, the action's
/// source size becomes `target`, so normalizing again is a no-op.
pub fn normalize_action(action: &mut Action, target: Size) -> bool {
    let Some(scale) = ScaleFactors::between(action.source, target) else {
        log::warn!(
            "Skipping normalization of action {}: source {:?}, target {:?}",
            action.id,
            action.source,
            target
        );
        return false;
    };
    if scale.is_identity() {
        return false;
    }

    match &mut action.kind {
        ActionKind::Stroke(stroke) => {
            stroke.path.apply_affine(scale.affine());
            stroke.width *= scale.uniform();
        }
        ActionKind::Fill(fill) => {
            fill.at = scale.point(fill.at);
        }
        ActionKind::Sticker(sticker) => {
            sticker.at = scale.point(sticker.at);
            sticker.size *= scale.uniform();
        }
        ActionKind::MagicFill(magic) => {
            for entry in &mut magic.entries {
                entry.x *= scale.x;
                entry.y *= scale.y;
            }
        }
    }

    action.source = target;
    true
}

/// Normalize every action into `target` space. Returns how many were rescaled.
pub fn normalize_actions(actions: &mut [Action], target: Size) -> usize {
    let rescaled = actions
        .iter_mut()
        .map(|action| normalize_action(action, target))
        .filter(|&changed| changed)
        .count();
    if rescaled > 0 {
        log::debug!("Rescaled {} of {} actions to {:?}", rescaled, actions.len(), target);
    }
    rescaled
}
