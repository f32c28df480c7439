//! PNG output.

use image::ImageEncoder;

use crate::error::RenderError;
use crate::surface::Surface;

/// Encode the surface as 8-bit straight-alpha RGBA PNG.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>, RenderError> {
    let rgba = surface.to_rgba8();

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            &rgba,
            surface.width(),
            surface.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e: image::ImageError| RenderError::Encoding(e.to_string()))?;

    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::{Colour, PaintDescriptor};
    use crate::render::{Bounds, DisplayList, DrawOp};

    #[test]
    fn test_png_round_trips_pixels() {
        let mut list = DisplayList::new(3, 2);
        list.push(DrawOp::FillRect {
            bounds: Bounds::new(0.0, 0.0, 1.0, 2.0),
            paint: PaintDescriptor::solid(Colour::rgb(0, 128, 0)),
        });
        let surface = Surface::composite(list).unwrap();
        let bytes = encode_png(&surface).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 1).0, [0, 128, 0, 255]);
        assert_eq!(decoded.get_pixel(2, 0).0, [0, 0, 0, 0]);
    }
}
