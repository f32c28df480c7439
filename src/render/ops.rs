//! Draw operations emitted by the field renderer.
//!
//! A render pass produces a [`DisplayList`]. PNG output rasterizes it onto a
//! surface; PDF output translates each operation into page content, adding
//! the [`DrawOp::Text`] spans as an invisible text layer.

use tiny_skia::{Path, Pixmap, Transform};

use crate::paint::{Composite, PaintDescriptor};

/// An axis-aligned rectangle in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Text to expose as a selectable layer in vector output.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub left: f32,
    pub baseline: f32,
    /// Font size in pixels.
    pub size: f32,
    /// Drawn width in pixels, after any maxWidth compression. The PDF text
    /// layer stretches its own glyphs to this width.
    pub width: f32,
    pub transform: Transform,
}

/// One drawing operation.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// Flat fill of a rectangle, ignoring any transform.
    FillRect { bounds: Bounds, paint: PaintDescriptor },
    FillPath {
        path: Path,
        paint: PaintDescriptor,
        transform: Transform,
    },
    StrokePath {
        path: Path,
        paint: PaintDescriptor,
        width: f32,
        transform: Transform,
    },
    /// Bitmap stretched into `bounds`.
    Image {
        pixmap: Pixmap,
        bounds: Bounds,
        composite: Composite,
        /// Bilinear filtering; off for pixel-exact content such as QR codes.
        smooth: bool,
        transform: Transform,
    },
    /// Selectable text; not drawn on the raster surface.
    Text(TextSpan),
}

/// Ordered draw operations for one document.
#[derive(Debug, Clone)]
pub struct DisplayList {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Selectable text spans, in draw order.
    pub fn text_spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(span) => Some(span),
            _ => None,
        })
    }
}
