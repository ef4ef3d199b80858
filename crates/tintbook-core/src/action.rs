//! Drawing actions and their wire representation.
//!
//! An [`Action`] is one semantic drawing operation. Both renderers author and
//! replay the same schema; each action carries the size of the coordinate
//! space it was recorded in, which is what makes it portable between them.

use kurbo::{BezPath, Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an action.
pub type ActionId = Uuid;

/// Errors raised while encoding or decoding actions.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Invalid stroke path: {0}")]
    InvalidPath(String),
    #[error("Invalid source dimensions {width}x{height}")]
    InvalidSource { width: f64, height: f64 },
    #[error("Unknown action type: {0}")]
    UnknownType(String),
    #[error("Invalid action id: {0}")]
    InvalidId(String),
    #[error("Malformed action data: {0}")]
    Data(#[from] serde_json::Error),
}

/// RGBA8 color, serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    /// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` hex string.
    pub fn from_hex(hex: &str) -> Result<Self, ActionError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let invalid = || ActionError::InvalidColor(hex.to_string());
        if !digits.is_ascii() {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());

        match digits.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (i, c) in digits.chars().enumerate() {
                    let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                    channels[i] = v * 17;
                }
                Ok(Self::rgb(channels[0], channels[1], channels[2]))
            }
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(invalid()),
        }
    }

    /// Format as lowercase hex. Opaque colors omit the alpha byte.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Color {
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl TryFrom<String> for Color {
    type Error = ActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Brush used to draw a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushKind {
    #[default]
    Pen,
    Marker,
    Crayon,
    Pencil,
    Rainbow,
    Eraser,
    Glitter,
}

/// How a fill paints its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillKind {
    #[default]
    Solid,
    Pattern,
}

/// Texture used by pattern fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Dots,
    Stripes,
    Checker,
    Hearts,
    Stars,
}

/// A freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub brush: BrushKind,
    pub width: f64,
    pub path: BezPath,
    /// Per-sample stylus pressure, in path order.
    pub pressure: Option<Vec<f32>>,
    pub stylus: Option<bool>,
    /// Starting hue (degrees) for rainbow brushes.
    pub rainbow_start_hue: Option<f64>,
}

impl Stroke {
    pub fn new(color: Color, brush: BrushKind, width: f64, path: BezPath) -> Self {
        Self {
            color,
            brush,
            width,
            path,
            pressure: None,
            stylus: None,
            rainbow_start_hue: None,
        }
    }

    /// Build a polyline stroke through the given points.
    pub fn from_points(color: Color, brush: BrushKind, width: f64, points: &[Point]) -> Self {
        let mut path = BezPath::new();
        if let Some((first, rest)) = points.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
        }
        Self::new(color, brush, width, path)
    }
}

/// A bucket fill seeded at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: Color,
    pub at: Point,
    pub kind: FillKind,
    pub pattern: Option<PatternKind>,
}

impl Fill {
    pub fn solid(color: Color, at: Point) -> Self {
        Self {
            color,
            at,
            kind: FillKind::Solid,
            pattern: None,
        }
    }

    pub fn pattern(color: Color, at: Point, pattern: PatternKind) -> Self {
        Self {
            color,
            at,
            kind: FillKind::Pattern,
            pattern: Some(pattern),
        }
    }
}

/// A placed sticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Sticker {
    pub symbol: String,
    pub at: Point,
    pub size: f64,
}

/// One seed of a magic fill batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagicFillEntry {
    pub x: f64,
    pub y: f64,
    pub color: Color,
}

impl MagicFillEntry {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A batch of solid fills applied as a single undoable step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MagicFill {
    pub entries: Vec<MagicFillEntry>,
}

/// The operation an action performs.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Stroke(Stroke),
    Fill(Fill),
    Sticker(Sticker),
    MagicFill(MagicFill),
}

impl ActionKind {
    /// Wire name of this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionKind::Stroke(_) => "stroke",
            ActionKind::Fill(_) => "fill",
            ActionKind::Sticker(_) => "sticker",
            ActionKind::MagicFill(_) => "magic_fill",
        }
    }
}

/// One drawing operation, tagged with the coordinate space it was authored in.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub(crate) id: ActionId,
    pub(crate) timestamp: u64,
    pub(crate) source: Size,
    pub(crate) kind: ActionKind,
}

impl Action {
    /// Create an action authored in a `source`-sized coordinate space.
    pub fn new(kind: ActionKind, source: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_millis(),
            source,
            kind,
        }
    }

    pub fn stroke(stroke: Stroke, source: Size) -> Self {
        Self::new(ActionKind::Stroke(stroke), source)
    }

    pub fn fill(fill: Fill, source: Size) -> Self {
        Self::new(ActionKind::Fill(fill), source)
    }

    pub fn sticker(sticker: Sticker, source: Size) -> Self {
        Self::new(ActionKind::Sticker(sticker), source)
    }

    pub fn magic_fill(magic: MagicFill, source: Size) -> Self {
        Self::new(ActionKind::MagicFill(magic), source)
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Creation time in Unix milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Size of the coordinate space the action's coordinates are expressed in.
    pub fn source(&self) -> Size {
        self.source
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    /// Encode for storage or transport.
    pub fn to_record(&self) -> Result<ActionRecord, ActionError> {
        let source_width = self.source.width;
        let source_height = self.source.height;
        let data = match &self.kind {
            ActionKind::Stroke(s) => serde_json::to_value(StrokeData {
                color: s.color,
                brush_type: s.brush,
                stroke_width: s.width,
                path: s.path.to_svg(),
                pressure: s.pressure.clone(),
                is_stylus: s.stylus,
                rainbow_start_hue: s.rainbow_start_hue,
                source_width,
                source_height,
            })?,
            ActionKind::Fill(f) => serde_json::to_value(FillData {
                color: f.color,
                x: f.at.x,
                y: f.at.y,
                fill_type: f.kind,
                pattern_type: f.pattern,
                source_width,
                source_height,
            })?,
            ActionKind::Sticker(s) => serde_json::to_value(StickerData {
                symbol_id: s.symbol.clone(),
                x: s.at.x,
                y: s.at.y,
                size: s.size,
                source_width,
                source_height,
            })?,
            ActionKind::MagicFill(m) => serde_json::to_value(MagicFillData {
                entries: m.entries.clone(),
                source_width,
                source_height,
            })?,
        };

        Ok(ActionRecord {
            id: self.id.to_string(),
            kind: self.kind.type_name().to_string(),
            timestamp: self.timestamp,
            data,
        })
    }

    /// Decode a stored or transmitted record.
    pub fn from_record(record: &ActionRecord) -> Result<Self, ActionError> {
        let id = Uuid::parse_str(&record.id).map_err(|_| ActionError::InvalidId(record.id.clone()))?;
        let data = record.data.clone();

        let (kind, source) = match record.kind.as_str() {
            "stroke" => {
                let d: StrokeData = serde_json::from_value(data)?;
                let path = decode_path(&d.path)?;
                let source = checked_source(d.source_width, d.source_height)?;
                let stroke = Stroke {
                    color: d.color,
                    brush: d.brush_type,
                    width: d.stroke_width,
                    path,
                    pressure: d.pressure,
                    stylus: d.is_stylus,
                    rainbow_start_hue: d.rainbow_start_hue,
                };
                (ActionKind::Stroke(stroke), source)
            }
            "fill" => {
                let d: FillData = serde_json::from_value(data)?;
                let source = checked_source(d.source_width, d.source_height)?;
                let fill = Fill {
                    color: d.color,
                    at: Point::new(d.x, d.y),
                    kind: d.fill_type,
                    pattern: d.pattern_type,
                };
                (ActionKind::Fill(fill), source)
            }
            "sticker" => {
                let d: StickerData = serde_json::from_value(data)?;
                let source = checked_source(d.source_width, d.source_height)?;
                let sticker = Sticker {
                    symbol: d.symbol_id,
                    at: Point::new(d.x, d.y),
                    size: d.size,
                };
                (ActionKind::Sticker(sticker), source)
            }
            "magic_fill" => {
                let d: MagicFillData = serde_json::from_value(data)?;
                let source = checked_source(d.source_width, d.source_height)?;
                (ActionKind::MagicFill(MagicFill { entries: d.entries }), source)
            }
            other => return Err(ActionError::UnknownType(other.to_string())),
        };

        Ok(Self {
            id,
            timestamp: record.timestamp,
            source,
            kind,
        })
    }
}

/// Wire form of an action: `{ id, type, timestamp, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: u64,
    pub data: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrokeData {
    color: Color,
    #[serde(default)]
    brush_type: BrushKind,
    stroke_width: f64,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pressure: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_stylus: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rainbow_start_hue: Option<f64>,
    source_width: f64,
    source_height: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FillData {
    color: Color,
    x: f64,
    y: f64,
    #[serde(default)]
    fill_type: FillKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern_type: Option<PatternKind>,
    source_width: f64,
    source_height: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StickerData {
    symbol_id: String,
    x: f64,
    y: f64,
    size: f64,
    source_width: f64,
    source_height: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MagicFillData {
    entries: Vec<MagicFillEntry>,
    source_width: f64,
    source_height: f64,
}

fn checked_source(width: f64, height: f64) -> Result<Size, ActionError> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(Size::new(width, height))
    } else {
        Err(ActionError::InvalidSource { width, height })
    }
}

/// Parse SVG path data into stroke geometry.
///
/// Blank data is the encoding of a stroke with no geometry and decodes to an
/// empty path.
pub fn decode_path(data: &str) -> Result<BezPath, ActionError> {
    if data.trim().is_empty() {
        return Ok(BezPath::new());
    }
    BezPath::from_svg(data).map_err(|e| ActionError::InvalidPath(e.to_string()))
}

/// Encode a batch of actions.
pub fn encode_actions(actions: &[Action]) -> Result<Vec<ActionRecord>, ActionError> {
    actions.iter().map(Action::to_record).collect()
}

/// Decode a batch of records, dropping any that fail to parse.
///
/// One malformed record never prevents the rest of the history from loading.
pub fn decode_actions(records: &[ActionRecord]) -> Vec<Action> {
    records
        .iter()
        .filter_map(|record| match Action::from_record(record) {
            Ok(action) => Some(action),
            Err(e) => {
                log::warn!("Dropping malformed {} action {}: {}", record.kind, record.id, e);
                None
            }
        })
        .collect()
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Size {
        Size::new(880.0, 660.0)
    }

    fn sample_stroke() -> Stroke {
        let mut path = BezPath::new();
        path.move_to((12.5, 40.25));
        path.line_to((80.0, 41.0));
        path.quad_to((120.0, 10.0), (160.125, 90.0));
        path.curve_to((170.0, 95.0), (180.0, 99.5), (200.0, 100.0));
        let mut stroke = Stroke::new(Color::rgb(0xff, 0x66, 0x00), BrushKind::Crayon, 14.5, path);
        stroke.pressure = Some(vec![0.25, 0.5, 0.75, 1.0]);
        stroke.stylus = Some(true);
        stroke.rainbow_start_hue = Some(210.0);
        stroke
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#ff6600").unwrap(), Color::rgb(255, 102, 0));
        assert_eq!(Color::from_hex("#f60").unwrap(), Color::rgb(255, 102, 0));
        assert_eq!(Color::from_hex("#00000080").unwrap(), Color::new(0, 0, 0, 128));
        assert_eq!(Color::new(1, 2, 3, 4).to_hex(), "#01020304");
        assert_eq!(Color::white().to_hex(), "#ffffff");
        assert!(Color::from_hex("#ggg").is_err());
        assert!(Color::from_hex("#12345").is_err());
    }

    #[test]
    fn test_stroke_round_trip() {
        let action = Action::stroke(sample_stroke(), canvas());
        let record = action.to_record().unwrap();
        assert_eq!(record.kind, "stroke");

        let json = serde_json::to_string(&record).unwrap();
        let parsed: ActionRecord = serde_json::from_str(&json).unwrap();
        let decoded = Action::from_record(&parsed).unwrap();

        assert_eq!(decoded, action);
    }

    #[test]
    fn test_round_trip_all_kinds() {
        let actions = vec![
            Action::fill(Fill::pattern(Color::rgb(10, 20, 30), Point::new(5.5, 6.5), PatternKind::Stars), canvas()),
            Action::sticker(
                Sticker { symbol: "star-gold".to_string(), at: Point::new(100.0, 200.0), size: 64.0 },
                canvas(),
            ),
            Action::magic_fill(
                MagicFill {
                    entries: vec![
                        MagicFillEntry { x: 1.0, y: 2.0, color: Color::rgb(1, 2, 3) },
                        MagicFillEntry { x: 300.0, y: 400.0, color: Color::new(9, 8, 7, 6) },
                    ],
                },
                Size::new(1024.0, 768.0),
            ),
        ];

        let records = encode_actions(&actions).unwrap();
        let decoded = decode_actions(&records);
        assert_eq!(decoded, actions);
    }

    #[test]
    fn test_wire_shape() {
        let action = Action::fill(Fill::solid(Color::rgb(255, 0, 0), Point::new(3.0, 4.0)), canvas());
        let value = serde_json::to_value(action.to_record().unwrap()).unwrap();

        assert_eq!(value["type"], "fill");
        assert_eq!(value["data"]["color"], "#ff0000");
        assert_eq!(value["data"]["fillType"], "solid");
        assert_eq!(value["data"]["sourceWidth"], 880.0);
        assert_eq!(value["data"]["sourceHeight"], 660.0);
        assert!(value["data"].get("patternType").is_none());
    }

    #[test]
    fn test_malformed_record_is_dropped() {
        let good = Action::stroke(sample_stroke(), canvas()).to_record().unwrap();
        let mut bad_path = good.clone();
        bad_path.data["path"] = serde_json::Value::String("M 10 Q banana".to_string());
        let mut no_source = good.clone();
        no_source.data.as_object_mut().unwrap().remove("sourceWidth");
        let unknown = ActionRecord {
            id: Uuid::new_v4().to_string(),
            kind: "smudge".to_string(),
            timestamp: 0,
            data: serde_json::json!({}),
        };

        let decoded = decode_actions(&[bad_path, good.clone(), no_source, unknown]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id().to_string(), good.id);
    }

    #[test]
    fn test_zero_source_is_rejected() {
        let mut record = Action::fill(Fill::solid(Color::black(), Point::ZERO), canvas())
            .to_record()
            .unwrap();
        record.data["sourceWidth"] = serde_json::json!(0.0);

        assert!(matches!(
            Action::from_record(&record),
            Err(ActionError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_stroke_from_points() {
        let stroke = Stroke::from_points(
            Color::black(),
            BrushKind::Pen,
            4.0,
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
        );
        assert_eq!(stroke.path.elements().len(), 3);
        assert_eq!(decode_path(&stroke.path.to_svg()).unwrap(), stroke.path);
    }

    /// Xorshift source so generated strokes are reproducible.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }

        /// Any finite coordinate, including negative and fractional ones.
        fn coord(&mut self) -> f64 {
            (self.next() >> 11) as f64 / (1u64 << 53) as f64 * 4000.0 - 1000.0
        }

        fn point(&mut self) -> Point {
            Point::new(self.coord(), self.coord())
        }
    }

    fn generated_stroke(rng: &mut Rng, brush: BrushKind, segments: usize) -> Stroke {
        let mut path = BezPath::new();
        if segments > 0 {
            path.move_to(rng.point());
        }
        for _ in 1..segments {
            match rng.below(4) {
                0 => path.line_to(rng.point()),
                1 => path.quad_to(rng.point(), rng.point()),
                2 => path.curve_to(rng.point(), rng.point(), rng.point()),
                _ => path.move_to(rng.point()),
            }
        }
        let color = Color::new(
            rng.below(256) as u8,
            rng.below(256) as u8,
            rng.below(256) as u8,
            rng.below(256) as u8,
        );
        let mut stroke = Stroke::new(color, brush, 0.5 * (1 + rng.below(80)) as f64, path);
        if rng.below(2) == 0 {
            stroke.pressure = Some((0..segments).map(|_| rng.below(17) as f32 / 16.0).collect());
        }
        stroke.stylus = [None, Some(false), Some(true)][rng.below(3) as usize];
        if brush == BrushKind::Rainbow || rng.below(3) == 0 {
            stroke.rainbow_start_hue = Some(15.0 * rng.below(24) as f64);
        }
        stroke
    }

    #[test]
    fn test_generated_strokes_round_trip() {
        let brushes = [
            BrushKind::Pen,
            BrushKind::Marker,
            BrushKind::Crayon,
            BrushKind::Pencil,
            BrushKind::Rainbow,
            BrushKind::Eraser,
            BrushKind::Glitter,
        ];
        let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
        let mut actions = vec![
            Action::stroke(Stroke::from_points(Color::black(), BrushKind::Pen, 3.0, &[]), canvas()),
            Action::stroke(
                Stroke::from_points(Color::black(), BrushKind::Pencil, 3.0, &[Point::new(7.0, 9.0)]),
                canvas(),
            ),
        ];
        for brush in brushes {
            for segments in [0, 1, 2, 5, 17] {
                actions.push(Action::stroke(generated_stroke(&mut rng, brush, segments), canvas()));
            }
        }

        for action in &actions {
            let json = serde_json::to_string(&action.to_record().unwrap()).unwrap();
            let record: ActionRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(Action::from_record(&record).unwrap(), *action, "record {json}");
        }
        assert_eq!(decode_actions(&encode_actions(&actions).unwrap()), actions);
    }
}
