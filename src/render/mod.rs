//! # Rendering Module
//!
//! Turns a normalized [`Document`] into a [`DisplayList`]: background
//! colour, background image, then every field in declaration order.
//!
//! ## Modules
//!
//! - [`date`]: strftime formatting with an ISO-8601 fallback
//! - [`field`]: per-field value resolution and draw operations
//! - [`ops`]: the draw operations and display list
//!
//! ## Failure policy
//!
//! | Condition                         | Outcome                     |
//! |-----------------------------------|-----------------------------|
//! | Unparseable background colour     | black background, warning   |
//! | Unreadable background image       | skipped, warning            |
//! | Unreadable field image            | render fails                |
//! | QR generation failure             | render fails                |
//! | Unusable date pattern             | ISO-8601 text, warning      |

pub mod date;
pub mod field;
pub mod ops;

pub use field::{RenderEnv, render_field};
pub use ops::{Bounds, DisplayList, DrawOp, TextSpan};

use log::{debug, warn};
use tiny_skia::Transform;

use crate::assets;
use crate::document::Document;
use crate::error::RenderError;
use crate::paint::{self, Colour, Composite, PaintDescriptor};

/// Background value that leaves the surface unpainted.
pub const TRANSPARENT_BACKGROUND: &str = "transparent";

/// Surface pixel size for a document: the floor of each dimension, at least 1.
pub fn surface_size(document: &Document) -> (u32, u32) {
    let px = |v: f64| if v.is_finite() && v >= 1.0 { v.floor() as u32 } else { 1 };
    (px(document.width), px(document.height))
}

/// Build the display list for `document`.
///
/// Field values are resolved in place, so after a successful call every
/// rendered field carries the value it was drawn with.
pub fn build_display_list(
    document: &mut Document,
    env: &RenderEnv<'_>,
) -> Result<DisplayList, RenderError> {
    let (width, height) = surface_size(document);
    let mut list = DisplayList::new(width, height);
    let full = Bounds::new(0.0, 0.0, width as f32, height as f32);

    let background = document.background_colour.trim();
    if !background.eq_ignore_ascii_case(TRANSPARENT_BACKGROUND) {
        list.push(DrawOp::FillRect {
            bounds: full,
            paint: PaintDescriptor::solid(paint::colour_or(background, Colour::BLACK)),
        });
    }

    if let Some(reference) = document.background_image.as_deref().filter(|r| !r.is_empty()) {
        match assets::load(reference, env.resolver).and_then(|bytes| assets::decode_image(&bytes)) {
            Ok(pixmap) => list.push(DrawOp::Image {
                pixmap,
                bounds: full,
                composite: Composite::SourceOver,
                smooth: true,
                transform: Transform::identity(),
            }),
            Err(e) => warn!("Failed to draw background image {:?}: {}", reference, e),
        }
    }

    let context = document.context.clone();
    for field in document.fields.iter_mut() {
        render_field(field, &context, env, &mut list.ops)?;
    }

    debug!(
        "Built display list: {}x{}, {} ops, {} fields",
        width,
        height,
        list.ops.len(),
        document.fields.len()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssetStore;
    use crate::document::{Field, Point};
    use crate::font::FontRegistry;
    use crate::paint::Fill;
    use chrono::Utc;

    fn build(document: &mut Document) -> Result<DisplayList, RenderError> {
        let store = StaticAssetStore::new("/nonexistent");
        let fonts = FontRegistry::new();
        let env = RenderEnv {
            resolver: &store,
            fonts: &fonts,
            now: Utc::now(),
        };
        build_display_list(document, &env)
    }

    #[test]
    fn test_surface_size_floors() {
        let doc = Document::new(800.7, 0.4);
        assert_eq!(surface_size(&doc), (800, 1));
    }

    #[test]
    fn test_background_fill() {
        let mut doc = Document::new(10.0, 10.0);
        doc.background_colour = "#ff0000".into();
        let list = build(&mut doc).unwrap();
        assert!(matches!(
            &list.ops[0],
            DrawOp::FillRect { paint, .. } if paint.fill == Fill::Solid(Colour::rgb(255, 0, 0))
        ));
    }

    #[test]
    fn test_invalid_background_is_black() {
        let mut doc = Document::new(10.0, 10.0);
        doc.background_colour = "not-a-colour".into();
        let list = build(&mut doc).unwrap();
        assert!(matches!(
            &list.ops[0],
            DrawOp::FillRect { paint, .. } if paint.fill == Fill::Solid(Colour::BLACK)
        ));
    }

    #[test]
    fn test_transparent_background_skips_fill() {
        let mut doc = Document::new(10.0, 10.0);
        doc.background_colour = "transparent".into();
        assert!(build(&mut doc).unwrap().ops.is_empty());
    }

    #[test]
    fn test_missing_background_image_is_skipped() {
        let mut doc = Document::new(10.0, 10.0);
        doc.background_image = Some("missing/background.png".into());
        let list = build(&mut doc).unwrap();
        assert_eq!(list.ops.len(), 1);
    }

    #[test]
    fn test_fields_draw_in_order() {
        let mut doc = Document::new(200.0, 100.0)
            .with_field(Field::text("a", Point::new(10.0, 20.0), Some("first")))
            .with_field(Field::text("b", Point::new(10.0, 60.0), Some("second")));
        for field in doc.fields.iter_mut() {
            if let Some(tf) = field.kind.text_format_mut() {
                tf.selectable = true;
            }
        }
        let list = build(&mut doc).unwrap();
        let texts: Vec<_> = list.text_spans().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
