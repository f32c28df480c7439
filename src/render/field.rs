//! Per-field rendering.
//!
//! Each field starts from default paint state and its own rotation
//! transform, resolves its value, and emits draw operations. Nothing about
//! one field's paint or transform reaches the next.

use chrono::{DateTime, Utc};
use log::debug;
use tiny_skia::Transform;

use super::date::{DEFAULT_DATE_FORMAT, format_date};
use super::ops::{Bounds, DrawOp, TextSpan};
use crate::assets::{self, AssetResolver};
use crate::config::SINGLE_WHITE_PIXEL;
use crate::document::{DEFAULT_FONT_PX, DateValue, DocumentContext, Field, FieldKind, Point, TextFormat};
use crate::error::RenderError;
use crate::font::{FontRegistry, layout_text};
use crate::paint::{self, Colour, Composite};
use crate::placeholder;
use crate::qr::render_qr;

/// Drawn for `true` Boolean values.
pub const CHECK_GLYPH: &str = "✓";
/// Drawn for `false` Boolean values.
pub const CROSS_GLYPH: &str = "✕";
/// Drawn for Boolean fields with no value.
pub const UNKNOWN_GLYPH: &str = "?";

/// Drawn by QR fields with no value.
pub const EMPTY_QR_DATA: &str = "empty";

/// Shared, read-only inputs of one render pass.
pub struct RenderEnv<'a> {
    pub resolver: &'a dyn AssetResolver,
    pub fonts: &'a FontRegistry,
    /// Instant `"now"` dates resolve to, fixed for the whole pass.
    pub now: DateTime<Utc>,
}

/// Rotation about the field anchor, in degrees.
pub fn field_transform(field: &Field) -> Transform {
    Transform::from_rotate_at(
        field.rotation as f32,
        field.position.x as f32,
        field.position.y as f32,
    )
}

/// Render one field into `ops`, recording its resolved value on the field.
///
/// Image decode and QR generation failures are fatal and returned as-is.
pub fn render_field(
    field: &mut Field,
    ctx: &DocumentContext,
    env: &RenderEnv<'_>,
    ops: &mut Vec<DrawOp>,
) -> Result<(), RenderError> {
    if field.skip {
        return Ok(());
    }

    let transform = field_transform(field);

    if field.placeholder {
        placeholder::resolve(field, ctx);
    }

    let position = field.position;
    let name = field.name.as_str();

    match &mut field.kind {
        FieldKind::String {
            text_format,
            value,
            default_value,
        } => {
            let resolved = value
                .clone()
                .or_else(|| default_value.clone())
                .unwrap_or_else(|| name.to_string());
            let text = truncate(&resolved, text_format.max_chars);
            draw_text(&text, text_format, position, transform, env, ops);
            *value = Some(text);
        }
        FieldKind::Number {
            text_format,
            value,
            default_value,
        } => {
            let resolved = value.or(*default_value);
            let text = match resolved {
                Some(n) => n.to_string(),
                None => name.to_string(),
            };
            // The name label has no numeric form, so only a real value is recorded.
            draw_text(&text, text_format, position, transform, env, ops);
            *value = resolved;
        }
        FieldKind::Boolean {
            text_format,
            value,
            default_value,
        } => {
            let resolved = value.or(*default_value);
            let glyph = match resolved {
                Some(true) => CHECK_GLYPH,
                Some(false) => CROSS_GLYPH,
                None => UNKNOWN_GLYPH,
            };
            draw_text(glyph, text_format, position, transform, env, ops);
            *value = resolved;
        }
        FieldKind::Date {
            text_format,
            date_format,
            value,
            default_value,
        } => {
            let resolved = value.or(*default_value).unwrap_or(DateValue::Now);
            let text = match resolved.instant(env.now) {
                Some(instant) => {
                    *value = Some(DateValue::Instant(instant));
                    format_date(instant, date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT))
                }
                None => {
                    // Unresolved token (e.g. in a template preview) shows literally.
                    *value = Some(resolved);
                    resolved.to_string()
                }
            };
            draw_text(&text, text_format, position, transform, env, ops);
        }
        FieldKind::Image {
            image,
            value,
            default_value,
        } => {
            let resolved = value.clone().or_else(|| default_value.clone());
            let (reference, composite) = match &resolved {
                Some(reference) => (reference.as_str(), Composite::SourceOver),
                // No value: an inverted rectangle marks the slot.
                None => (SINGLE_WHITE_PIXEL, Composite::Difference),
            };

            let bytes = assets::load(reference, env.resolver)
                .map_err(|e| field_error(name, e))?;
            let pixmap = assets::decode_image(&bytes).map_err(|e| field_error(name, e))?;

            ops.push(DrawOp::Image {
                pixmap,
                bounds: Bounds::new(
                    position.x as f32,
                    position.y as f32,
                    image.size.width as f32,
                    image.size.height as f32,
                ),
                composite,
                smooth: resolved.is_some(),
                transform,
            });
            *value = resolved;
        }
        FieldKind::Qr {
            qr,
            value,
            default_value,
        } => {
            let resolved = value.clone().or_else(|| default_value.clone());
            let data = resolved.as_deref().unwrap_or(EMPTY_QR_DATA);
            let side = qr.size.width.max(qr.size.height).floor().max(1.0) as u32;
            let pixmap = render_qr(data, side, qr.margin).map_err(|e| field_error(name, e))?;

            ops.push(DrawOp::Image {
                pixmap,
                bounds: Bounds::new(
                    position.x as f32,
                    position.y as f32,
                    qr.size.width as f32,
                    qr.size.height as f32,
                ),
                composite: Composite::SourceOver,
                smooth: false,
                transform,
            });
            *value = resolved;
        }
    }

    Ok(())
}

fn field_error(name: &str, err: RenderError) -> RenderError {
    match err {
        RenderError::Asset(msg) => RenderError::Asset(format!("field '{}': {}", name, msg)),
        RenderError::Geometry(msg) => RenderError::Geometry(format!("field '{}': {}", name, msg)),
        other => other,
    }
}

fn truncate(text: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(n) => text.chars().take(n).collect(),
        None => text.to_string(),
    }
}

/// Fill (and optionally outline) a line of text at `position`.
fn draw_text(
    text: &str,
    format: &TextFormat,
    position: Point,
    transform: Transform,
    env: &RenderEnv<'_>,
    ops: &mut Vec<DrawOp>,
) {
    let text = truncate(text, format.max_chars);

    let paint = paint::resolve(format.style.as_ref());
    let font = env.fonts.lookup(&format.font_family);
    let px = match format.font_size.pixels() {
        px if px.is_finite() && px > 0.0 => px as f32,
        px => {
            debug!("Invalid font size {}px, using default", px);
            DEFAULT_FONT_PX as f32
        }
    };
    let anchor = (position.x as f32, position.y as f32);
    let align = format.align.resolve(format.direction);

    let run = layout_text(font, &text, px, anchor, align, format.max_width.map(|w| w as f32));
    if let Some(path) = run.path.clone() {
        ops.push(DrawOp::FillPath {
            path,
            paint: paint.clone(),
            transform,
        });
    }

    if format.selectable && !text.trim().is_empty() && run.width > 0.0 {
        ops.push(DrawOp::Text(TextSpan {
            text: text.clone(),
            left: run.left,
            baseline: run.baseline,
            size: px,
            width: run.width,
            transform,
        }));
    }

    if let Some(stroke) = &format.stroke {
        let colour = paint::colour_or(&stroke.colour, Colour::BLACK);
        let width = match stroke.width {
            w if w.is_finite() && w > 0.0 => w as f32,
            _ => 1.0,
        };
        // Outlines are drawn without maxWidth compression.
        let outline = layout_text(font, &text, px, anchor, align, None);
        if let Some(path) = outline.path {
            ops.push(DrawOp::StrokePath {
                path,
                paint: paint.with_colour(colour),
                width,
                transform,
            });
        }
    }
}
