//! # Asset Resolution
//!
//! Image references in documents are either inline `data:` URIs or paths
//! into the managed static-asset store. [`AssetResolver`] is the seam the
//! renderer loads non-inline references through; [`StaticAssetStore`] is the
//! filesystem-backed implementation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use std::path::{Component, Path, PathBuf};
use tiny_skia::{IntSize, Pixmap};

use crate::error::RenderError;

/// Loads the raw bytes behind an asset reference.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<Vec<u8>, RenderError>;
}

/// Resolves relative paths under a static directory.
#[derive(Debug, Clone)]
pub struct StaticAssetStore {
    root: PathBuf,
}

impl StaticAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a reference, refusing anything that escapes the root.
    pub fn locate(&self, reference: &str) -> Result<PathBuf, RenderError> {
        let relative = Path::new(reference.trim_start_matches(['/', '\\']));
        if relative.as_os_str().is_empty() {
            return Err(RenderError::Asset("empty asset path".to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(RenderError::Asset(format!(
                        "asset path escapes the static dir: {}",
                        reference
                    )));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl AssetResolver for StaticAssetStore {
    fn resolve(&self, reference: &str) -> Result<Vec<u8>, RenderError> {
        if is_data_uri(reference) {
            return decode_data_uri(reference);
        }
        if is_remote(reference) {
            return Err(RenderError::Asset(format!(
                "remote assets are not supported: {}",
                reference
            )));
        }

        let path = self.locate(reference)?;
        debug!("Loading asset {}", path.display());
        std::fs::read(&path)
            .map_err(|e| RenderError::Asset(format!("{}: {}", path.display(), e)))
    }
}

pub fn is_data_uri(reference: &str) -> bool {
    reference.starts_with("data:")
}

fn is_remote(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Decode the payload of a `data:` URI.
///
/// Base64 payloads (`;base64,`) are decoded; anything else is taken as
/// literal bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, RenderError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::Asset("not a data URI".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::Asset("data URI has no payload".to_string()))?;

    if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| RenderError::Asset(format!("invalid base64 in data URI: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Load a reference: inline data directly, everything else through `resolver`.
pub fn load(reference: &str, resolver: &dyn AssetResolver) -> Result<Vec<u8>, RenderError> {
    if is_data_uri(reference) {
        decode_data_uri(reference)
    } else {
        resolver.resolve(reference)
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into a premultiplied pixmap.
pub fn decode_image(bytes: &[u8]) -> Result<Pixmap, RenderError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Asset(format!("could not decode image: {}", e)))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
            px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
            px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
        }
    }

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| RenderError::Asset("image has zero size".to_string()))?;
    Pixmap::from_vec(data, size)
        .ok_or_else(|| RenderError::Asset(format!("image too large: {}x{}", width, height)))
}
