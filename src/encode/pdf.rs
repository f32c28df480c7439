//! PDF output.
//!
//! The page is the display list size in points and every draw operation
//! becomes vector page content:
//!
//! | Operation | Page content |
//! |-----------|--------------|
//! | fill rect | `re f` |
//! | fill path | `m`/`l`/`c`/`h`, then `f` (nonzero winding) |
//! | stroke path | the same path, `w`, `S` |
//! | image | image XObject (soft mask when translucent), placed with `cm` |
//!
//! Drawing happens under a single y-flip, so surface coordinates and each
//! operation's transform carry over unchanged. Difference compositing and
//! colour alpha go through `ExtGState` dictionaries; linear gradients become
//! axial shading patterns.
//!
//! Selectable text spans are written last in render mode 3 (invisible),
//! stretched with `Tz` to the width the visible glyphs occupy, so viewers
//! can select and search them. The text layer uses the standard Helvetica
//! font with WinAnsi encoding; characters outside Latin-1 are written as `?`.

use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LoDocument, Object as LoObject, Stream as LoStream, StringFormat, dictionary};
use std::collections::HashMap;
use tiny_skia::{Path, PathSegment, Pixmap, Point as SkiaPoint, Transform};

use crate::document::Point;
use crate::error::RenderError;
use crate::paint::{Colour, ColourStop, Composite, Fill, PaintDescriptor, sorted_stops};
use crate::render::{Bounds, DisplayList, DrawOp, TextSpan};

const FONT_NAME: &str = "F1";

/// Matches the rasterizer's default stroke.
const MITER_LIMIT: f32 = 4.0;

/// Helvetica advance widths for WinAnsi 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Used for Latin-1 characters above 0x7E.
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Document information written to the PDF `Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: String,
    pub creator: String,
}

impl PdfMetadata {
    pub fn new(title: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: creator.into(),
        }
    }
}

fn lopdf_err(err: lopdf::Error) -> RenderError {
    RenderError::Encoding(format!("PDF: {}", err))
}

/// Encode the display list as a single-page vector PDF.
pub fn encode_pdf(list: &DisplayList, metadata: &PdfMetadata) -> Result<Vec<u8>, RenderError> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut page = PageWriter::new(&mut doc, list.height as f32);
    page.draw_list(list);
    let spans: Vec<&TextSpan> = list.text_spans().collect();
    page.text_layer(&spans);
    let (content, resources) = page.finish();

    let content_id = doc.add_object(LoStream::new(
        dictionary! {},
        content.encode().map_err(lopdf_err)?,
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources,
        "MediaBox" => vec![0.into(), 0.into(), (list.width as i64).into(), (list.height as i64).into()],
    });
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(&metadata.title),
        "Creator" => text_string(&metadata.creator),
        "Producer" => text_string(&metadata.creator),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Blend mode and constant alpha of one draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GraphicsState {
    difference: bool,
    fill_alpha: u8,
    stroke_alpha: u8,
}

const NORMAL_STATE: GraphicsState = GraphicsState {
    difference: false,
    fill_alpha: 255,
    stroke_alpha: 255,
};

/// Page content plus the resources it refers to.
struct PageWriter<'a> {
    doc: &'a mut LoDocument,
    /// Surface space (y-down) to PDF user space (y-up).
    flip: Transform,
    operations: Vec<Operation>,
    states: HashMap<GraphicsState, Vec<u8>>,
    ext_gstates: Dictionary,
    patterns: Dictionary,
    xobjects: Dictionary,
    fonts: Dictionary,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a mut LoDocument, height: f32) -> Self {
        Self {
            doc,
            flip: Transform::from_row(1.0, 0.0, 0.0, -1.0, 0.0, height),
            operations: Vec::new(),
            states: HashMap::new(),
            ext_gstates: Dictionary::new(),
            patterns: Dictionary::new(),
            xobjects: Dictionary::new(),
            fonts: Dictionary::new(),
        }
    }

    fn push(&mut self, operator: &str, operands: Vec<LoObject>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn finish(self) -> (Content, Dictionary) {
        let mut resources = Dictionary::new();
        for (key, dict) in [
            ("ExtGState", self.ext_gstates),
            ("Pattern", self.patterns),
            ("XObject", self.xobjects),
            ("Font", self.fonts),
        ] {
            if !dict.is_empty() {
                resources.set(key, dict);
            }
        }
        let content = Content {
            operations: self.operations,
        };
        (content, resources)
    }

    fn draw_list(&mut self, list: &DisplayList) {
        self.push("q", vec![]);
        self.push("cm", matrix_operands(self.flip));
        for op in &list.ops {
            self.draw(op);
        }
        self.push("Q", vec![]);

        debug!(
            "PDF page: {} ops, {} images, {} patterns",
            list.ops.len(),
            self.xobjects.len(),
            self.patterns.len()
        );
    }

    fn draw(&mut self, op: &DrawOp) {
        match op {
            DrawOp::FillRect { bounds, paint } => {
                if !has_area(bounds) || !has_fill(paint) {
                    return;
                }
                self.push("q", vec![]);
                self.set_paint(paint, Transform::identity(), false);
                self.push(
                    "re",
                    vec![
                        bounds.x.into(),
                        bounds.y.into(),
                        bounds.width.into(),
                        bounds.height.into(),
                    ],
                );
                self.push("f", vec![]);
                self.push("Q", vec![]);
            }
            DrawOp::FillPath {
                path,
                paint,
                transform,
            } => {
                if !has_fill(paint) {
                    return;
                }
                self.push("q", vec![]);
                self.push("cm", matrix_operands(*transform));
                self.set_paint(paint, *transform, false);
                self.path(path);
                self.push("f", vec![]);
                self.push("Q", vec![]);
            }
            DrawOp::StrokePath {
                path,
                paint,
                width,
                transform,
            } => {
                if !has_fill(paint) {
                    return;
                }
                self.push("q", vec![]);
                self.push("cm", matrix_operands(*transform));
                self.set_paint(paint, *transform, true);
                self.push("w", vec![(*width).into()]);
                self.push("M", vec![MITER_LIMIT.into()]);
                self.path(path);
                self.push("S", vec![]);
                self.push("Q", vec![]);
            }
            DrawOp::Image {
                pixmap,
                bounds,
                composite,
                smooth,
                transform,
            } => {
                if !has_area(bounds) {
                    return;
                }
                let name = self.add_image(pixmap, *smooth);
                self.push("q", vec![]);
                self.push("cm", matrix_operands(*transform));
                self.set_state(GraphicsState {
                    difference: *composite == Composite::Difference,
                    ..NORMAL_STATE
                });
                // Image space is the unit square with the first row at the top.
                let placement = Transform::from_row(
                    bounds.width,
                    0.0,
                    0.0,
                    -bounds.height,
                    bounds.x,
                    bounds.y + bounds.height,
                );
                self.push("cm", matrix_operands(placement));
                self.push("Do", vec![LoObject::Name(name)]);
                self.push("Q", vec![]);
            }
            DrawOp::Text(_) => {}
        }
    }

    fn path(&mut self, path: &Path) {
        let mut current = SkiaPoint::from_xy(0.0, 0.0);
        let mut start = current;
        for segment in path.segments() {
            match segment {
                PathSegment::MoveTo(p) => {
                    self.push("m", point_operands(&[p]));
                    current = p;
                    start = p;
                }
                PathSegment::LineTo(p) => {
                    self.push("l", point_operands(&[p]));
                    current = p;
                }
                PathSegment::QuadTo(q, p) => {
                    let (c1, c2) = quad_to_cubic(current, q, p);
                    self.push("c", point_operands(&[c1, c2, p]));
                    current = p;
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    self.push("c", point_operands(&[c1, c2, p]));
                    current = p;
                }
                PathSegment::Close => {
                    self.push("h", vec![]);
                    current = start;
                }
            }
        }
    }

    /// Select fill (or stroke) paint. `transform` is the operation's own,
    /// which gradients are defined under.
    fn set_paint(&mut self, paint: &PaintDescriptor, transform: Transform, stroking: bool) {
        let alpha = match paint.fill {
            Fill::Solid(colour) => colour.a,
            Fill::Linear { .. } => 255,
        };
        self.set_state(GraphicsState {
            difference: paint.composite == Composite::Difference,
            fill_alpha: if stroking { 255 } else { alpha },
            stroke_alpha: if stroking { alpha } else { 255 },
        });

        match &paint.fill {
            Fill::Solid(colour) => self.set_colour(*colour, stroking),
            Fill::Linear { start, end, stops } => {
                let sorted = sorted_stops(stops);
                match axial_shading(*start, *end, &sorted) {
                    Some(shading) => {
                        let name = self.add_pattern(shading, transform);
                        let (space, colour) = if stroking { ("CS", "SCN") } else { ("cs", "scn") };
                        self.push(space, vec![LoObject::Name(b"Pattern".to_vec())]);
                        self.push(colour, vec![LoObject::Name(name)]);
                    }
                    None => {
                        if let Some(last) = sorted.last() {
                            self.set_colour(last.colour, stroking);
                        }
                    }
                }
            }
        }
    }

    fn set_colour(&mut self, colour: Colour, stroking: bool) {
        self.push(if stroking { "RG" } else { "rg" }, rgb_operands(colour));
    }

    fn set_state(&mut self, state: GraphicsState) {
        if state == NORMAL_STATE {
            return;
        }
        let name = match self.states.get(&state) {
            Some(name) => name.clone(),
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "BM" => if state.difference { "Difference" } else { "Normal" },
                    "ca" => f32::from(state.fill_alpha) / 255.0,
                    "CA" => f32::from(state.stroke_alpha) / 255.0,
                });
                let name = format!("GS{}", self.states.len() + 1).into_bytes();
                self.ext_gstates.set(name.clone(), id);
                self.states.insert(state, name.clone());
                name
            }
        };
        self.push("gs", vec![LoObject::Name(name)]);
    }

    fn add_pattern(&mut self, shading: Dictionary, transform: Transform) -> Vec<u8> {
        // Pattern space is the page's default space, not the current one.
        let matrix = transform.post_concat(self.flip);
        let id = self.doc.add_object(dictionary! {
            "Type" => "Pattern",
            "PatternType" => 2,
            "Shading" => shading,
            "Matrix" => matrix_operands(matrix),
        });
        let name = format!("P{}", self.patterns.len() + 1).into_bytes();
        self.patterns.set(name.clone(), id);
        name
    }

    fn add_image(&mut self, pixmap: &Pixmap, smooth: bool) -> Vec<u8> {
        let pixels = pixmap.pixels();
        let mut rgb = Vec::with_capacity(pixels.len() * 3);
        let mut alpha = Vec::with_capacity(pixels.len());
        for px in pixels {
            let c = px.demultiply();
            rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
            alpha.push(c.alpha());
        }

        let mut image = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => pixmap.width() as i64,
            "Height" => pixmap.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Interpolate" => smooth,
        };
        if alpha.iter().any(|&a| a < 255) {
            let smask_id = self.doc.add_object(LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => pixmap.width() as i64,
                    "Height" => pixmap.height() as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            image.set("SMask", smask_id);
        }

        let id = self.doc.add_object(LoStream::new(image, rgb));
        let name = format!("Im{}", self.xobjects.len() + 1).into_bytes();
        self.xobjects.set(name.clone(), id);
        name
    }

    fn text_layer(&mut self, spans: &[&TextSpan]) {
        if spans.is_empty() {
            return;
        }
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.set(FONT_NAME, font_id);

        self.push("BT", vec![]);
        self.push("Tr", vec![3.into()]);
        for span in spans {
            let text = win_ansi(&span.text);
            let matrix = Transform::from_row(1.0, 0.0, 0.0, -1.0, span.left, span.baseline)
                .post_concat(span.transform)
                .post_concat(self.flip);

            self.push(
                "Tf",
                vec![LoObject::Name(FONT_NAME.as_bytes().to_vec()), span.size.into()],
            );
            self.push("Tz", vec![horizontal_scale(span, &text).into()]);
            self.push("Tm", matrix_operands(matrix));
            self.push("Tj", vec![LoObject::String(text, StringFormat::Literal)]);
        }
        self.push("ET", vec![]);
    }
}

fn has_area(bounds: &Bounds) -> bool {
    bounds.width > 0.0 && bounds.height > 0.0 && bounds.x.is_finite() && bounds.y.is_finite()
}

/// A gradient without stops draws nothing.
fn has_fill(paint: &PaintDescriptor) -> bool {
    !matches!(&paint.fill, Fill::Linear { stops, .. } if stops.is_empty())
}

fn matrix_operands(t: Transform) -> Vec<LoObject> {
    vec![t.sx.into(), t.ky.into(), t.kx.into(), t.sy.into(), t.tx.into(), t.ty.into()]
}

fn point_operands(points: &[SkiaPoint]) -> Vec<LoObject> {
    points.iter().flat_map(|p| [p.x.into(), p.y.into()]).collect()
}

fn rgb_operands(colour: Colour) -> Vec<LoObject> {
    [colour.r, colour.g, colour.b]
        .iter()
        .map(|&c| (f32::from(c) / 255.0).into())
        .collect()
}

/// Control points of the cubic equal to the quadratic `p0 q p`.
fn quad_to_cubic(p0: SkiaPoint, q: SkiaPoint, p: SkiaPoint) -> (SkiaPoint, SkiaPoint) {
    let c1 = SkiaPoint::from_xy(p0.x + 2.0 / 3.0 * (q.x - p0.x), p0.y + 2.0 / 3.0 * (q.y - p0.y));
    let c2 = SkiaPoint::from_xy(p.x + 2.0 / 3.0 * (q.x - p.x), p.y + 2.0 / 3.0 * (q.y - p.y));
    (c1, c2)
}

/// Axial shading for sorted stops, padded beyond both ends like the raster.
///
/// `None` when the gradient degenerates to its last colour: a single stop,
/// or start and end points that coincide.
fn axial_shading(start: Point, end: Point, stops: &[ColourStop]) -> Option<Dictionary> {
    let length = (end.x - start.x).hypot(end.y - start.y);
    if stops.len() < 2 || length < f64::from(f32::EPSILON) {
        return None;
    }

    let mut stops = stops.to_vec();
    if let Some(first) = stops.first().copied() {
        if first.fraction > 0.0 {
            stops.insert(0, ColourStop { fraction: 0.0, ..first });
        }
    }
    if let Some(last) = stops.last().copied() {
        if last.fraction < 1.0 {
            stops.push(ColourStop { fraction: 1.0, ..last });
        }
    }

    let mut segments: Vec<LoObject> = stops
        .windows(2)
        .map(|pair| {
            LoObject::Dictionary(dictionary! {
                "FunctionType" => 2,
                "Domain" => vec![0.into(), 1.into()],
                "C0" => rgb_operands(pair[0].colour),
                "C1" => rgb_operands(pair[1].colour),
                "N" => 1,
            })
        })
        .collect();

    let function = if segments.len() == 1 {
        segments.remove(0)
    } else {
        let bounds: Vec<LoObject> = stops[1..stops.len() - 1]
            .iter()
            .map(|stop| stop.fraction.into())
            .collect();
        let encode: Vec<LoObject> = segments.iter().flat_map(|_| [0.into(), 1.into()]).collect();
        LoObject::Dictionary(dictionary! {
            "FunctionType" => 3,
            "Domain" => vec![0.into(), 1.into()],
            "Functions" => segments,
            "Bounds" => bounds,
            "Encode" => encode,
        })
    };

    Some(dictionary! {
        "ShadingType" => 2,
        "ColorSpace" => "DeviceRGB",
        "Coords" => vec![
            (start.x as f32).into(),
            (start.y as f32).into(),
            (end.x as f32).into(),
            (end.y as f32).into(),
        ],
        "Function" => function,
        "Extend" => vec![true.into(), true.into()],
    })
}

/// `Tz` percentage that stretches Helvetica to the span's drawn width.
fn horizontal_scale(span: &TextSpan, text: &[u8]) -> f32 {
    let units: u32 = text
        .iter()
        .map(|&b| match b {
            0x20..=0x7e => u32::from(HELVETICA_WIDTHS[usize::from(b - 0x20)]),
            _ => u32::from(HELVETICA_DEFAULT_WIDTH),
        })
        .sum();
    let natural = units as f32 / 1000.0 * span.size;
    if natural > 0.0 && span.width > 0.0 {
        100.0 * span.width / natural
    } else {
        100.0
    }
}

/// Latin-1 bytes for the text layer, `?` for anything unrepresentable.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u8,
            _ => b'?',
        })
        .collect()
}

/// A PDF text string: literal when ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> LoObject {
    if text.is_ascii() {
        LoObject::string_literal(text)
    } else {
        let mut bytes = vec![0xfe, 0xff];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        LoObject::String(bytes, StringFormat::Hexadecimal)
    }
}
