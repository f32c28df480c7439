//! # Dimension Normalisation
//!
//! Rasterizer backends cap the surface side length. Documents larger than
//! the cap are scaled down uniformly: the dominant side becomes exactly the
//! cap, the other side keeps the aspect ratio, and every field position,
//! font size and image/QR size is multiplied by the same factor.
//!
//! Rotation, `maxWidth`, stroke widths and gradient coordinates are left
//! as declared, and text is not re-wrapped after scaling.

use log::info;

use crate::document::Document;

/// Scale `document` in place so neither side exceeds `max_dimension`.
///
/// Returns the conversion factor applied, or `None` when the document
/// already fits (in which case nothing is touched).
pub fn normalize(document: &mut Document, max_dimension: u32) -> Option<f64> {
    let max = f64::from(max_dimension);
    let (width, height) = (document.width, document.height);

    if width <= max && height <= max {
        return None;
    }

    let ratio = width / height;
    let conversion = if width >= height {
        document.width = max;
        document.height = max / ratio;
        max / width
    } else {
        document.height = max;
        document.width = max * ratio;
        max / height
    };

    for field in &mut document.fields {
        field.position.x *= conversion;
        field.position.y *= conversion;

        if let Some(text_format) = field.kind.text_format_mut() {
            text_format.font_size.scale(conversion);
        } else if let Some(size) = field.kind.size_mut() {
            size.width *= conversion;
            size.height *= conversion;
        }
    }

    info!(
        "Scaled {}x{} document to {}x{} (conversion {})",
        width, height, document.width, document.height, conversion
    );

    Some(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Field, FieldKind, FontSize, FontUnit, Point, QrFormat, Size};

    const EPSILON: f64 = 1e-9;

    fn sample(width: f64, height: f64) -> Document {
        let mut text = Field::text("name", Point::new(1000.0, 500.0), Some("Ada"));
        if let Some(tf) = text.kind.text_format_mut() {
            tf.font_size = FontSize::px(100.0);
            tf.max_width = Some(800.0);
        }
        let qr = Field::new(
            "code",
            Point::new(200.0, 300.0),
            FieldKind::Qr {
                qr: QrFormat {
                    size: Size::new(400.0, 200.0),
                    margin: 2,
                },
                value: None,
                default_value: None,
            },
        )
        .rotation(45.0);
        Document::new(width, height).with_field(text).with_field(qr)
    }

    fn font_px(doc: &Document) -> f64 {
        doc.fields[0].kind.text_format().map(|tf| tf.font_size.value).unwrap()
    }

    #[test]
    fn test_identity_when_within_limit() {
        let mut doc = sample(9830.0, 5000.0);
        let before = doc.clone();
        assert_eq!(normalize(&mut doc, 9830), None);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_scales_wide_document() {
        let mut doc = sample(20000.0, 10000.0);
        let conversion = normalize(&mut doc, 9830).unwrap();

        assert!((conversion - 0.4915).abs() < EPSILON);
        assert!((doc.width - 9830.0).abs() < EPSILON);
        assert!((doc.height - 4915.0).abs() < EPSILON);

        let text = &doc.fields[0];
        assert!((text.position.x - 491.5).abs() < EPSILON);
        assert!((text.position.y - 245.75).abs() < EPSILON);
        assert!((font_px(&doc) - 49.15).abs() < EPSILON);
        // maxWidth is not rescaled.
        assert_eq!(text.kind.text_format().unwrap().max_width, Some(800.0));

        let qr = &doc.fields[1];
        let size = qr.kind.size().unwrap();
        assert!((size.width - 196.6).abs() < EPSILON);
        assert!((size.height - 98.3).abs() < EPSILON);
        assert_eq!(qr.rotation, 45.0);
    }

    #[test]
    fn test_scales_tall_document() {
        let mut doc = sample(3000.0, 12000.0);
        let conversion = normalize(&mut doc, 6000).unwrap();
        assert!((conversion - 0.5).abs() < EPSILON);
        assert!((doc.height - 6000.0).abs() < EPSILON);
        assert!((doc.width - 1500.0).abs() < EPSILON);
        assert!((doc.width / doc.height - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_square_document_resolves_toward_width() {
        let mut doc = sample(10000.0, 10000.0);
        normalize(&mut doc, 5000).unwrap();
        assert_eq!(doc.width, 5000.0);
        assert!((doc.height - 5000.0).abs() < EPSILON);
    }

    #[test]
    fn test_idempotent() {
        let mut doc = sample(20000.0, 7000.0);
        normalize(&mut doc, 9830);
        let once = doc.clone();
        assert_eq!(normalize(&mut doc, 9830), None);
        assert_eq!(doc, once);
    }

    #[test]
    fn test_relative_font_units_keep_unit() {
        let mut doc = sample(20000.0, 10000.0);
        if let Some(tf) = doc.fields[0].kind.text_format_mut() {
            tf.font_size = "2em".parse().unwrap();
        }
        normalize(&mut doc, 10000);
        let size = doc.fields[0].kind.text_format().unwrap().font_size;
        assert_eq!(size.unit, FontUnit::Em);
        assert!((size.pixels() - 10.0).abs() < EPSILON);
    }
}
