//! Field and style types for the document model.
//!
//! All types derive `Serialize + Deserialize` so the same structs back both
//! Rust construction and the JSON template/certificate format. Keys are
//! camelCase on the wire, field kinds are discriminated by `"type"`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::placeholder::Placeholder;

// ============================================================================
// GEOMETRY
// ============================================================================

/// A point in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Declared size of an Image or QR field.
///
/// Accepts both `{"width", "height"}` and the shorter `{"x", "y"}` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    #[serde(alias = "x")]
    pub width: f64,
    #[serde(alias = "y")]
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// FONT SIZE
// ============================================================================

/// Pixel size the renderer falls back to (and the base for relative units).
pub const DEFAULT_FONT_PX: f64 = 10.0;

/// Unit attached to a font size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontUnit {
    #[default]
    Px,
    Pt,
    Em,
    Rem,
    Percent,
}

impl FontUnit {
    fn suffix(self) -> &'static str {
        match self {
            FontUnit::Px => "px",
            FontUnit::Pt => "pt",
            FontUnit::Em => "em",
            FontUnit::Rem => "rem",
            FontUnit::Percent => "%",
        }
    }
}

/// Font size as written in a template: a bare number (pixels) or a
/// string with a CSS unit such as `"24pt"` or `"1.5em"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSize {
    pub value: f64,
    pub unit: FontUnit,
}

impl FontSize {
    pub fn px(value: f64) -> Self {
        Self {
            value,
            unit: FontUnit::Px,
        }
    }

    /// Resolved size in surface pixels.
    pub fn pixels(&self) -> f64 {
        match self.unit {
            FontUnit::Px => self.value,
            FontUnit::Pt => self.value * 4.0 / 3.0,
            FontUnit::Em | FontUnit::Rem => self.value * DEFAULT_FONT_PX,
            FontUnit::Percent => self.value / 100.0 * DEFAULT_FONT_PX,
        }
    }

    /// Multiply the numeric part, keeping the unit.
    pub fn scale(&mut self, factor: f64) {
        self.value *= factor;
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self::px(DEFAULT_FONT_PX)
    }
}

impl FromStr for FontSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Longest suffixes first so "rem" is not read as "em".
        let units = [
            ("rem", FontUnit::Rem),
            ("px", FontUnit::Px),
            ("pt", FontUnit::Pt),
            ("em", FontUnit::Em),
            ("%", FontUnit::Percent),
        ];
        let (number, unit) = units
            .iter()
            .find_map(|(suffix, unit)| s.strip_suffix(suffix).map(|n| (n, *unit)))
            .unwrap_or((s, FontUnit::Px));

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid font size {:?}", s))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("invalid font size {:?}", s));
        }
        Ok(Self { value, unit })
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl Serialize for FontSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.unit {
            FontUnit::Px => serializer.serialize_f64(self.value),
            _ => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for FontSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SizeValue {
            Number(f64),
            Text(String),
        }

        match SizeValue::deserialize(deserializer)? {
            SizeValue::Number(n) => Ok(FontSize::px(n)),
            SizeValue::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// TEXT FORMAT
// ============================================================================

/// Horizontal text alignment relative to the field anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Start,
    End,
    Left,
    Right,
    #[serde(alias = "centre")]
    Center,
}

/// Text direction. Only affects how `start`/`end` alignment resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "inherit")]
    Ltr,
    Rtl,
}

/// Alignment after `start`/`end` have been resolved against a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn resolve(self, direction: Direction) -> HorizontalAlign {
        match (self, direction) {
            (Align::Left, _) => HorizontalAlign::Left,
            (Align::Right, _) => HorizontalAlign::Right,
            (Align::Center, _) => HorizontalAlign::Center,
            (Align::Start, Direction::Ltr) | (Align::End, Direction::Rtl) => HorizontalAlign::Left,
            (Align::Start, Direction::Rtl) | (Align::End, Direction::Ltr) => HorizontalAlign::Right,
        }
    }
}

fn default_colour() -> String {
    "black".to_string()
}

fn default_stroke_width() -> f64 {
    1.0
}

fn default_font_family() -> String {
    "monospace".to_string()
}

/// Outline drawn over text after the fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(default = "default_colour", alias = "color")]
    pub colour: String,
    #[serde(default = "default_stroke_width")]
    pub width: f64,
}

/// One colour stop of a linear gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    #[serde(alias = "offset")]
    pub fraction: f64,
    #[serde(default = "default_colour", alias = "color")]
    pub colour: String,
}

/// Linear gradient between two points in surface coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    #[serde(default)]
    pub start: Point,
    #[serde(default)]
    pub end: Point,
    #[serde(default)]
    pub stops: Vec<GradientStop>,
}

/// Fill style of a text field.
///
/// A colour of `"invert"` draws with difference blending against white.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Style {
    #[serde(alias = "color")]
    Colour {
        #[serde(default = "default_colour", alias = "color")]
        colour: String,
    },
    Gradient { gradient: Gradient },
}

impl Default for Style {
    fn default() -> Self {
        Style::Colour {
            colour: default_colour(),
        }
    }
}

/// Font and paint settings shared by String, Number, Boolean and Date fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub direction: Direction,
    /// Adds a selectable text layer in PDF output.
    #[serde(default)]
    pub selectable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    /// Text wider than this is compressed horizontally to fit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: FontSize::default(),
            align: Align::default(),
            direction: Direction::default(),
            selectable: false,
            style: None,
            stroke: None,
            max_width: None,
            max_chars: None,
        }
    }
}

fn default_qr_margin() -> u32 {
    1
}

/// Image field geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFormat {
    pub size: Size,
}

/// QR field geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrFormat {
    pub size: Size,
    /// Quiet zone in modules.
    #[serde(default = "default_qr_margin")]
    pub margin: u32,
}

// ============================================================================
// DATE VALUES
// ============================================================================

/// Value of a Date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    /// The render-time current instant.
    Now,
    Instant(DateTime<Utc>),
    /// A date placeholder token, resolved against the document context.
    Token(Placeholder),
}

impl DateValue {
    /// Concrete instant, or `None` for an unresolved token.
    pub fn instant(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateValue::Now => Some(now),
            DateValue::Instant(t) => Some(*t),
            DateValue::Token(_) => None,
        }
    }

    /// Build from epoch milliseconds.
    pub fn from_millis(ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(ms).single().map(DateValue::Instant)
    }
}

impl FromStr for DateValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("now") {
            return Ok(DateValue::Now);
        }
        if let Some(token) = Placeholder::from_token(s) {
            return Ok(DateValue::Token(token));
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(DateValue::Instant(t.with_timezone(&Utc)));
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(t) = d.and_hms_opt(0, 0, 0) {
                return Ok(DateValue::Instant(t.and_utc()));
            }
        }
        if let Ok(ms) = s.parse::<i64>() {
            if let Some(v) = DateValue::from_millis(ms) {
                return Ok(v);
            }
        }
        Err(format!("invalid date {:?}", s))
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Now => f.write_str("now"),
            DateValue::Instant(t) => f.write_str(&t.to_rfc3339()),
            DateValue::Token(p) => f.write_str(p.token()),
        }
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDate {
            Millis(i64),
            Text(String),
        }

        match RawDate::deserialize(deserializer)? {
            RawDate::Millis(ms) => DateValue::from_millis(ms)
                .ok_or_else(|| serde::de::Error::custom(format!("date out of range: {}", ms))),
            RawDate::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// FIELDS
// ============================================================================

/// Discriminant of a field kind, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Image,
    Qr,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Image => "Image",
            FieldType::Qr => "QR",
        };
        f.write_str(name)
    }
}

/// Per-kind payload of a field.
///
/// `value` is what a certificate supplies, `default_value` what the template
/// falls back to. Both are typed per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum FieldKind {
    String {
        #[serde(default)]
        text_format: TextFormat,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
    },
    Number {
        #[serde(default)]
        text_format: TextFormat,
        #[serde(default)]
        value: Option<f64>,
        #[serde(default)]
        default_value: Option<f64>,
    },
    Boolean {
        #[serde(default)]
        text_format: TextFormat,
        #[serde(default)]
        value: Option<bool>,
        #[serde(default)]
        default_value: Option<bool>,
    },
    Date {
        #[serde(default)]
        text_format: TextFormat,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_format: Option<String>,
        #[serde(default)]
        value: Option<DateValue>,
        #[serde(default)]
        default_value: Option<DateValue>,
    },
    Image {
        image: ImageFormat,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
    },
    #[serde(rename = "QR", alias = "Qr")]
    Qr {
        qr: QrFormat,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        default_value: Option<String>,
    },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::String { .. } => FieldType::String,
            FieldKind::Number { .. } => FieldType::Number,
            FieldKind::Boolean { .. } => FieldType::Boolean,
            FieldKind::Date { .. } => FieldType::Date,
            FieldKind::Image { .. } => FieldType::Image,
            FieldKind::Qr { .. } => FieldType::Qr,
        }
    }

    /// Text settings, for the kinds drawn as text.
    pub fn text_format(&self) -> Option<&TextFormat> {
        match self {
            FieldKind::String { text_format, .. }
            | FieldKind::Number { text_format, .. }
            | FieldKind::Boolean { text_format, .. }
            | FieldKind::Date { text_format, .. } => Some(text_format),
            FieldKind::Image { .. } | FieldKind::Qr { .. } => None,
        }
    }

    pub fn text_format_mut(&mut self) -> Option<&mut TextFormat> {
        match self {
            FieldKind::String { text_format, .. }
            | FieldKind::Number { text_format, .. }
            | FieldKind::Boolean { text_format, .. }
            | FieldKind::Date { text_format, .. } => Some(text_format),
            FieldKind::Image { .. } | FieldKind::Qr { .. } => None,
        }
    }

    /// Declared size, for Image and QR fields.
    pub fn size(&self) -> Option<Size> {
        match self {
            FieldKind::Image { image, .. } => Some(image.size),
            FieldKind::Qr { qr, .. } => Some(qr.size),
            _ => None,
        }
    }

    pub fn size_mut(&mut self) -> Option<&mut Size> {
        match self {
            FieldKind::Image { image, .. } => Some(&mut image.size),
            FieldKind::Qr { qr, .. } => Some(&mut qr.size),
            _ => None,
        }
    }

    /// Whether either a value or a default is present.
    pub fn has_value(&self) -> bool {
        match self {
            FieldKind::String {
                value,
                default_value,
                ..
            }
            | FieldKind::Image {
                value,
                default_value,
                ..
            }
            | FieldKind::Qr {
                value,
                default_value,
                ..
            } => value.is_some() || default_value.is_some(),
            FieldKind::Number {
                value,
                default_value,
                ..
            } => value.is_some() || default_value.is_some(),
            FieldKind::Boolean {
                value,
                default_value,
                ..
            } => value.is_some() || default_value.is_some(),
            FieldKind::Date {
                value,
                default_value,
                ..
            } => value.is_some() || default_value.is_some(),
        }
    }

    /// Replace the value from a JSON certificate entry, converting it to
    /// the kind's value type.
    pub fn set_json_value(&mut self, raw: &serde_json::Value) -> Result<(), String> {
        use serde_json::Value;

        if raw.is_null() {
            return Err("empty values are not allowed".to_string());
        }

        match self {
            FieldKind::String { value, .. }
            | FieldKind::Image { value, .. }
            | FieldKind::Qr { value, .. } => match raw {
                Value::String(s) => *value = Some(s.clone()),
                other => return Err(format!("expected a string, got {}", other)),
            },
            FieldKind::Number { value, .. } => {
                let n = match raw {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match n {
                    Some(n) if n.is_finite() => *value = Some(n),
                    _ => return Err(format!("expected a number, got {}", raw)),
                }
            }
            FieldKind::Boolean { value, .. } => {
                let b = match raw {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) => parse_bool_word(s),
                    _ => None,
                };
                match b {
                    Some(b) => *value = Some(b),
                    None => return Err(format!("expected a boolean, got {}", raw)),
                }
            }
            FieldKind::Date { value, .. } => {
                let parsed =
                    DateValue::deserialize(raw).map_err(|e| format!("expected a date: {}", e))?;
                *value = Some(parsed);
            }
        }
        Ok(())
    }
}

/// Words accepted as booleans in certificate data.
fn parse_bool_word(s: &str) -> Option<bool> {
    const TRUES: &[&str] = &["true", "t", "y", "yes", "haan", "ok"];
    const FALSES: &[&str] = &["false", "f", "n", "no", "naheen", "bad"];

    let word = s.trim().to_ascii_lowercase();
    if TRUES.contains(&word.as_str()) {
        Some(true)
    } else if FALSES.contains(&word.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// One positioned, typed element of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub position: Point,
    /// Degrees, clockwise, about `position`.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub placeholder: bool,
    /// Certificates cannot override the value of a fixed field.
    #[serde(default)]
    pub fixed: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, position: Point, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            position,
            rotation: 0.0,
            skip: false,
            placeholder: false,
            fixed: false,
            kind,
        }
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn placeholder(mut self) -> Self {
        self.placeholder = true;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// String field drawn with default text settings.
    pub fn text(name: impl Into<String>, position: Point, value: Option<&str>) -> Self {
        Self::new(
            name,
            position,
            FieldKind::String {
                text_format: TextFormat::default(),
                value: value.map(str::to_string),
                default_value: None,
            },
        )
    }
}
