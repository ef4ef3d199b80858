//! Turning enumerated regions into persisted fill seeds.
//!
//! Deciding which color a region should get is left to a
//! [`RegionClassifier`]; this module only feeds it regions and collects the
//! resulting seeds.

use crate::action::{Action, Color, MagicFill, MagicFillEntry};
use crate::fill::Region;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Picks a color for a region, or `None` to leave it blank.
pub trait RegionClassifier {
    fn classify(&self, region: &Region) -> Option<Color>;
}

impl<F> RegionClassifier for F
where
    F: Fn(&Region) -> Option<Color>,
{
    fn classify(&self, region: &Region) -> Option<Color> {
        self(region)
    }
}

/// A seed for one region, in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillPoint {
    pub region_id: usize,
    pub x: f64,
    pub y: f64,
    pub color: Color,
}

impl From<FillPoint> for MagicFillEntry {
    fn from(point: FillPoint) -> Self {
        MagicFillEntry {
            x: point.x,
            y: point.y,
            color: point.color,
        }
    }
}

/// Region id to color, as produced by an external classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorMap(pub HashMap<usize, Color>);

impl ColorMap {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl RegionClassifier for ColorMap {
    fn classify(&self, region: &Region) -> Option<Color> {
        self.0.get(&region.id).copied()
    }
}

/// Ask `classifier` about every region and seed each colored one at its centroid.
pub fn assign_colors(regions: &[Region], classifier: &impl RegionClassifier) -> Vec<FillPoint> {
    let points: Vec<FillPoint> = regions
        .iter()
        .filter_map(|region| {
            let color = classifier.classify(region)?;
            Some(FillPoint {
                region_id: region.id,
                x: region.centroid.x,
                y: region.centroid.y,
                color,
            })
        })
        .collect();
    log::info!("Assigned colors to {} of {} regions", points.len(), regions.len());
    points
}

/// Bundle fill points into one magic fill action authored in `image_size` space.
pub fn magic_fill_action(points: &[FillPoint], image_size: Size) -> Action {
    let magic = MagicFill {
        entries: points.iter().copied().map(MagicFillEntry::from).collect(),
    };
    Action::magic_fill(magic, image_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::fill::PixelBounds;
    use kurbo::Point;

    fn region(id: usize, x: f64, pixel_count: usize) -> Region {
        Region {
            id,
            bounds: PixelBounds {
                min_x: 0,
                min_y: 0,
                max_x: 10,
                max_y: 10,
            },
            centroid: Point::new(x, 5.0),
            pixel_count,
        }
    }

    #[test]
    fn test_closure_classifier() {
        let regions = [region(0, 2.0, 400), region(1, 8.0, 60)];
        let big_only = |r: &Region| (r.pixel_count > 100).then(|| Color::rgb(0, 128, 255));

        let points = assign_colors(&regions, &big_only);
        assert_eq!(
            points,
            vec![FillPoint {
                region_id: 0,
                x: 2.0,
                y: 5.0,
                color: Color::rgb(0, 128, 255)
            }]
        );
    }

    #[test]
    fn test_color_map_from_json() {
        let map = ColorMap::from_json(r##"{"1": "#ff0000", "7": "#00ff00"}"##).unwrap();
        let regions = [region(0, 1.0, 90), region(1, 3.0, 90)];

        let points = assign_colors(&regions, &map);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].region_id, 1);
        assert_eq!(points[0].color, Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_magic_fill_action() {
        let points = [
            FillPoint { region_id: 0, x: 4.0, y: 4.0, color: Color::black() },
            FillPoint { region_id: 3, x: 40.0, y: 9.0, color: Color::white() },
        ];
        let action = magic_fill_action(&points, Size::new(64.0, 48.0));

        assert_eq!(action.source(), Size::new(64.0, 48.0));
        let ActionKind::MagicFill(magic) = action.kind() else {
            panic!("expected a magic fill");
        };
        assert_eq!(magic.entries.len(), 2);
        assert_eq!(magic.entries[1].point(), Point::new(40.0, 9.0));
    }
}
