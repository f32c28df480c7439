//! QR code rasterization.
//!
//! The raster is square with side `width`: modules plus a `margin`-module
//! quiet zone are scaled to fill it. When `width` is too small to hold one
//! pixel per module a fixed 4 px per module is used instead. Dark modules
//! are opaque black, everything else opaque white.

use qrcode::{EcLevel, QrCode};
use tiny_skia::{ColorU8, Pixmap};

use crate::error::RenderError;

/// Module scale used when the requested width cannot fit the code.
const FALLBACK_SCALE: f64 = 4.0;

/// Render `data` as a QR code raster about `width` pixels square.
pub fn render_qr(data: &str, width: u32, margin: u32) -> Result<Pixmap, RenderError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| RenderError::Asset(format!("QR code generation failed: {}", e)))?;

    let modules = code.width();
    let total = modules + 2 * margin as usize;
    let scale = if width as usize >= total {
        f64::from(width) / total as f64
    } else {
        FALLBACK_SCALE
    };
    let side = if width as usize >= total {
        width
    } else {
        (total as f64 * scale) as u32
    };

    let mut pixmap = Pixmap::new(side, side)
        .ok_or_else(|| RenderError::Geometry(format!("QR raster too large: {}px", side)))?;

    let dark = ColorU8::from_rgba(0, 0, 0, 255).premultiply();
    let light = ColorU8::from_rgba(255, 255, 255, 255).premultiply();
    let offset = f64::from(margin) * scale;

    let module_at = |pos: u32| -> Option<usize> {
        let m = ((f64::from(pos) - offset) / scale).floor();
        (m >= 0.0 && (m as usize) < modules).then_some(m as usize)
    };

    let side_px = side as usize;
    let pixels = pixmap.pixels_mut();
    for y in 0..side {
        let row = module_at(y);
        for x in 0..side {
            let is_dark = match (module_at(x), row) {
                (Some(qx), Some(qy)) => code[(qx, qy)] == qrcode::Color::Dark,
                _ => false,
            };
            pixels[y as usize * side_px + x as usize] = if is_dark { dark } else { light };
        }
    }

    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_dark(pixmap: &Pixmap, x: u32, y: u32) -> bool {
        pixmap.pixel(x, y).map(|p| p.red() == 0).unwrap_or(false)
    }

    #[test]
    fn test_fills_requested_width() {
        // "hello" is a version 1 code: 21 modules, 25 with a 2-module margin.
        let pixmap = render_qr("hello", 250, 2).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (250, 250));

        // Quiet zone is light, first finder pattern corner is dark.
        assert!(!is_dark(&pixmap, 5, 5));
        assert!(is_dark(&pixmap, 25, 25));
    }

    #[test]
    fn test_zero_margin_starts_with_finder() {
        let pixmap = render_qr("hello", 210, 0).unwrap();
        assert_eq!(pixmap.width(), 210);
        assert!(is_dark(&pixmap, 0, 0));
    }

    #[test]
    fn test_small_width_uses_fallback_scale() {
        let pixmap = render_qr("hello", 10, 1).unwrap();
        assert_eq!(pixmap.width(), 23 * 4);
    }

    #[test]
    fn test_pixels_are_opaque() {
        let pixmap = render_qr("empty", 100, 1).unwrap();
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 255));
    }
}
