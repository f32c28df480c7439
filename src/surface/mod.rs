//! # Raster Surface
//!
//! Rasterizes a [`DisplayList`] onto a premultiplied RGBA tiny-skia pixmap
//! for PNG output.
//! The surface starts fully transparent; every operation is composited in
//! list order with its own transform and blend mode.

use log::debug;
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, GradientStop, LinearGradient, Paint, Pixmap, PixmapPaint,
    Point as SkiaPoint, Rect, Shader, SpreadMode, Stroke, Transform,
};

use crate::error::RenderError;
use crate::paint::{Colour, ColourStop, Composite, Fill, PaintDescriptor, sorted_stops};
use crate::render::{DisplayList, DrawOp};

/// A rendered surface, keeping the display list it was drawn from.
#[derive(Debug, Clone)]
pub struct Surface {
    pub list: DisplayList,
    pub pixmap: Pixmap,
}

impl Surface {
    /// Rasterize `list`.
    pub fn composite(list: DisplayList) -> Result<Self, RenderError> {
        let mut pixmap = Pixmap::new(list.width, list.height).ok_or_else(|| {
            RenderError::Geometry(format!(
                "cannot allocate a {}x{} surface",
                list.width, list.height
            ))
        })?;

        for op in &list.ops {
            draw(&mut pixmap, op);
        }

        debug!("Composited {} ops onto {}x{}", list.ops.len(), list.width, list.height);
        Ok(Self { list, pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight (non-premultiplied) RGBA bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Straight RGBA of one pixel.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }
}

fn draw(pixmap: &mut Pixmap, op: &DrawOp) {
    match op {
        DrawOp::FillRect { bounds, paint } => {
            let Some(rect) = Rect::from_xywh(bounds.x, bounds.y, bounds.width, bounds.height) else {
                return;
            };
            if let Some(paint) = skia_paint(paint) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
        DrawOp::FillPath {
            path,
            paint,
            transform,
        } => {
            if let Some(paint) = skia_paint(paint) {
                pixmap.fill_path(path, &paint, FillRule::Winding, *transform, None);
            }
        }
        DrawOp::StrokePath {
            path,
            paint,
            width,
            transform,
        } => {
            if let Some(paint) = skia_paint(paint) {
                let stroke = Stroke {
                    width: *width,
                    ..Stroke::default()
                };
                pixmap.stroke_path(path, &paint, &stroke, *transform, None);
            }
        }
        DrawOp::Image {
            pixmap: image,
            bounds,
            composite,
            smooth,
            transform,
        } => {
            if !(bounds.width > 0.0 && bounds.height > 0.0) {
                return;
            }
            let sx = bounds.width / image.width() as f32;
            let sy = bounds.height / image.height() as f32;
            let placement = transform.pre_translate(bounds.x, bounds.y).pre_scale(sx, sy);
            let paint = PixmapPaint {
                opacity: 1.0,
                blend_mode: blend_mode(*composite),
                quality: if *smooth {
                    FilterQuality::Bilinear
                } else {
                    FilterQuality::Nearest
                },
            };
            pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, placement, None);
        }
        // Selectable text only exists in PDF output.
        DrawOp::Text(_) => {}
    }
}

fn blend_mode(composite: Composite) -> BlendMode {
    match composite {
        Composite::SourceOver => BlendMode::SourceOver,
        Composite::Difference => BlendMode::Difference,
    }
}

fn skia_colour(colour: Colour) -> Color {
    Color::from_rgba8(colour.r, colour.g, colour.b, colour.a)
}

/// Convert a paint descriptor to a tiny-skia paint.
///
/// Returns `None` when there is nothing to draw (a gradient with no stops).
pub fn skia_paint(desc: &PaintDescriptor) -> Option<Paint<'static>> {
    let shader = match &desc.fill {
        Fill::Solid(colour) => Shader::SolidColor(skia_colour(*colour)),
        Fill::Linear { start, end, stops } => linear_shader(*start, *end, stops)?,
    };

    Some(Paint {
        shader,
        blend_mode: blend_mode(desc.composite),
        anti_alias: true,
        ..Paint::default()
    })
}

fn linear_shader(
    start: crate::document::Point,
    end: crate::document::Point,
    stops: &[ColourStop],
) -> Option<Shader<'static>> {
    let sorted = sorted_stops(stops);
    let last = sorted.last()?.colour;

    let skia_stops = sorted
        .iter()
        .map(|stop| GradientStop::new(stop.fraction, skia_colour(stop.colour)))
        .collect();

    let shader = LinearGradient::new(
        SkiaPoint::from_xy(start.x as f32, start.y as f32),
        SkiaPoint::from_xy(end.x as f32, end.y as f32),
        skia_stops,
        SpreadMode::Pad,
        Transform::identity(),
    );
    Some(shader.unwrap_or(Shader::SolidColor(skia_colour(last))))
}
