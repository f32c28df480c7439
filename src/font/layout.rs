//! Single-line text layout into vector outlines.
//!
//! Glyphs are laid out along the baseline at `anchor.y` using unscaled
//! advances and kerning, then converted to a tiny-skia path. When the run is
//! wider than `max_width` it is compressed horizontally to fit, the way a
//! 2D canvas treats the `maxWidth` argument of `fillText`.

use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve};
use tiny_skia::{Path, PathBuilder};

use crate::document::HorizontalAlign;

/// A laid-out run of text.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Glyph outlines in surface coordinates; `None` for blank text.
    pub path: Option<Path>,
    /// Left edge of the run.
    pub left: f32,
    /// Baseline y.
    pub baseline: f32,
    /// Drawn width, after any compression.
    pub width: f32,
    /// Horizontal compression factor (1.0 when the text fits).
    pub compression: f32,
}

/// Advance width of `text` at `px` pixels per em.
pub fn measure(font: &FontArc, text: &str, px: f32) -> f32 {
    let (_, advance) = place_glyphs(font, text);
    advance * px / units_per_em(font)
}

fn units_per_em(font: &FontArc) -> f32 {
    font.units_per_em().filter(|u| *u > 0.0).unwrap_or(1000.0)
}

/// Glyph ids with their pen offsets in font units, plus the total advance.
fn place_glyphs(font: &FontArc, text: &str) -> (Vec<(GlyphId, f32)>, f32) {
    let mut placements = Vec::with_capacity(text.len());
    let mut pen = 0.0f32;
    let mut previous: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            pen += font.kern_unscaled(prev, id);
        }
        placements.push((id, pen));
        pen += font.h_advance_unscaled(id);
        previous = Some(id);
    }

    (placements, pen)
}

/// Lay out `text` at `px` pixels per em with its baseline at `anchor.1`.
///
/// `align` positions the run relative to `anchor.0`. A non-positive
/// `max_width` yields an empty run.
pub fn layout_text(
    font: &FontArc,
    text: &str,
    px: f32,
    anchor: (f32, f32),
    align: HorizontalAlign,
    max_width: Option<f32>,
) -> TextRun {
    let (x, baseline) = anchor;
    let scale = px / units_per_em(font);
    let (placements, advance) = place_glyphs(font, text);
    let natural = advance * scale;

    let compression = match max_width {
        Some(max) if !(max > 0.0) => {
            return TextRun {
                path: None,
                left: x,
                baseline,
                width: 0.0,
                compression: 0.0,
            };
        }
        Some(max) if natural > max => max / natural,
        _ => 1.0,
    };

    let width = natural * compression;
    let left = match align {
        HorizontalAlign::Left => x,
        HorizontalAlign::Center => x - width / 2.0,
        HorizontalAlign::Right => x - width,
    };

    let sx = scale * compression;
    let mut builder = PathBuilder::new();

    for (id, pen) in placements {
        let Some(outline) = font.outline(id) else {
            continue;
        };

        let map = |p: &ab_glyph::Point| (left + (pen + p.x) * sx, baseline - p.y * scale);
        let mut cursor: Option<(f32, f32)> = None;

        for curve in &outline.curves {
            let start = match curve {
                OutlineCurve::Line(p0, _)
                | OutlineCurve::Quad(p0, _, _)
                | OutlineCurve::Cubic(p0, _, _, _) => map(p0),
            };

            // A curve that does not continue from the last point opens a new contour.
            if cursor != Some(start) {
                if cursor.is_some() {
                    builder.close();
                }
                builder.move_to(start.0, start.1);
            }

            let end = match curve {
                OutlineCurve::Line(_, p1) => {
                    let (ex, ey) = map(p1);
                    builder.line_to(ex, ey);
                    (ex, ey)
                }
                OutlineCurve::Quad(_, c, p2) => {
                    let (cx, cy) = map(c);
                    let (ex, ey) = map(p2);
                    builder.quad_to(cx, cy, ex, ey);
                    (ex, ey)
                }
                OutlineCurve::Cubic(_, c1, c2, p3) => {
                    let (c1x, c1y) = map(c1);
                    let (c2x, c2y) = map(c2);
                    let (ex, ey) = map(p3);
                    builder.cubic_to(c1x, c1y, c2x, c2y, ex, ey);
                    (ex, ey)
                }
            };
            cursor = Some(end);
        }

        if cursor.is_some() {
            builder.close();
        }
    }

    TextRun {
        path: builder.finish(),
        left,
        baseline,
        width,
        compression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::default_font;

    #[test]
    fn test_measure_scales_with_size() {
        let font = default_font();
        let small = measure(font, "Hello", 10.0);
        let large = measure(font, "Hello", 20.0);
        assert!(small > 0.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn test_blank_text_has_no_path() {
        let run = layout_text(default_font(), "   ", 24.0, (0.0, 0.0), HorizontalAlign::Left, None);
        assert!(run.path.is_none());
        assert!(run.width > 0.0);
    }

    #[test]
    fn test_alignment_offsets() {
        let font = default_font();
        let left = layout_text(font, "Hi", 24.0, (100.0, 50.0), HorizontalAlign::Left, None);
        let center = layout_text(font, "Hi", 24.0, (100.0, 50.0), HorizontalAlign::Center, None);
        let right = layout_text(font, "Hi", 24.0, (100.0, 50.0), HorizontalAlign::Right, None);

        assert_eq!(left.left, 100.0);
        assert!((center.left - (100.0 - left.width / 2.0)).abs() < 1e-3);
        assert!((right.left - (100.0 - left.width)).abs() < 1e-3);
    }

    #[test]
    fn test_max_width_compresses() {
        let font = default_font();
        let natural = measure(font, "A long certificate line", 32.0);
        let run = layout_text(
            font,
            "A long certificate line",
            32.0,
            (0.0, 40.0),
            HorizontalAlign::Left,
            Some(natural / 2.0),
        );
        assert!((run.width - natural / 2.0).abs() < 1e-3);
        assert!((run.compression - 0.5).abs() < 1e-3);

        let bounds = run.path.unwrap().bounds();
        assert!(bounds.right() <= natural / 2.0 + 1.0);
    }

    #[test]
    fn test_glyphs_sit_on_baseline() {
        let run = layout_text(default_font(), "H", 100.0, (0.0, 200.0), HorizontalAlign::Left, None);
        let bounds = run.path.unwrap().bounds();
        // Cap height is above the baseline, nothing hangs below it.
        assert!(bounds.top() < 200.0 - 50.0);
        assert!(bounds.bottom() <= 200.0 + 0.5);
    }

    #[test]
    fn test_non_positive_max_width_draws_nothing() {
        let run = layout_text(default_font(), "Hi", 24.0, (0.0, 0.0), HorizontalAlign::Left, Some(0.0));
        assert!(run.path.is_none());
    }
}
