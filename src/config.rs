//! # Render Configuration
//!
//! Process-level settings for the renderer.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `MAX_DIMENSION_OVERRIDE` | Maximum surface side in pixels (1..=32767) |
//! | `INTERNAL_STATIC_DIR` | Root of the managed static-asset store |
//!
//! ## Usage
//!
//! ```
//! use rema::config::RenderConfig;
//!
//! let config = RenderConfig::default();
//! assert_eq!(config.max_surface_dimension, 9830);
//! ```

use log::warn;
use std::path::PathBuf;

/// Default maximum surface side. Larger documents are scaled down to fit.
pub const DEFAULT_MAX_SURFACE_DIMENSION: u32 = 9830;

/// Hard ceiling imposed by the rasterizer backends.
pub const MAX_SURFACE_DIMENSION_LIMIT: u32 = 32767;

/// 1x1 white PNG drawn (stretched, difference-blended) for image fields
/// that have no value.
pub const SINGLE_WHITE_PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/x8AAwMCAO+ip1sAAAAASUVORK5CYII=";

/// # Render Configuration
///
/// - **max_surface_dimension**: Largest allowed surface width or height in pixels
/// - **static_dir**: Directory that relative asset and font paths resolve against
/// - **creator**: Value written to the PDF `Creator` metadata entry
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub max_surface_dimension: u32,
    pub static_dir: PathBuf,
    pub creator: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_surface_dimension: DEFAULT_MAX_SURFACE_DIMENSION,
            static_dir: PathBuf::from("static"),
            creator: "Rema".to_string(),
        }
    }
}

impl RenderConfig {
    /// Build a configuration from the process environment, falling back to
    /// defaults for anything unset or out of range.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("MAX_DIMENSION_OVERRIDE") {
            match parse_max_dimension(&raw) {
                Some(dim) => config.max_surface_dimension = dim,
                None => warn!(
                    "Ignoring MAX_DIMENSION_OVERRIDE={:?}: expected an integer in 1..={}",
                    raw, MAX_SURFACE_DIMENSION_LIMIT
                ),
            }
        }

        if let Ok(dir) = std::env::var("INTERNAL_STATIC_DIR") {
            if !dir.trim().is_empty() {
                config.static_dir = PathBuf::from(dir);
            }
        }

        config
    }

    /// Override the maximum surface dimension. Values outside
    /// `1..=32767` are ignored.
    pub fn with_max_surface_dimension(mut self, dim: u32) -> Self {
        if (1..=MAX_SURFACE_DIMENSION_LIMIT).contains(&dim) {
            self.max_surface_dimension = dim;
        } else {
            warn!(
                "Ignoring max surface dimension {}: expected 1..={}",
                dim, MAX_SURFACE_DIMENSION_LIMIT
            );
        }
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

/// Parse a maximum-dimension override, accepting only `1..=32767`.
pub fn parse_max_dimension(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|dim| (1..=MAX_SURFACE_DIMENSION_LIMIT).contains(dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.max_surface_dimension, 9830);
        assert_eq!(config.creator, "Rema");
    }

    #[test]
    fn test_parse_max_dimension() {
        assert_eq!(parse_max_dimension("4096"), Some(4096));
        assert_eq!(parse_max_dimension(" 32767 "), Some(32767));
        assert_eq!(parse_max_dimension("32768"), None);
        assert_eq!(parse_max_dimension("0"), None);
        assert_eq!(parse_max_dimension("big"), None);
    }

    #[test]
    fn test_with_max_surface_dimension_rejects_out_of_range() {
        let config = RenderConfig::default().with_max_surface_dimension(40000);
        assert_eq!(config.max_surface_dimension, DEFAULT_MAX_SURFACE_DIMENSION);

        let config = RenderConfig::default().with_max_surface_dimension(2000);
        assert_eq!(config.max_surface_dimension, 2000);
    }
}
