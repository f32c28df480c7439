//! # Output Encoding
//!
//! Serializes a [`DisplayList`] into the requested output format.
//!
//! | Format | Content type      | Contents                                       |
//! |--------|-------------------|------------------------------------------------|
//! | PNG    | `image/png`       | rasterized surface, 8-bit RGBA                 |
//! | PDF    | `application/pdf` | one vector page, optional invisible text layer |

pub mod pdf;
pub mod png;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RenderError;
use crate::render::DisplayList;
use crate::surface::Surface;

pub use pdf::PdfMetadata;

/// Output format of a render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Png,
    Pdf,
}

impl RenderFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RenderFormat::Png => "png",
            RenderFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            RenderFormat::Png => "image/png",
            RenderFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for RenderFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" | "image/png" => Ok(RenderFormat::Png),
            "pdf" | "application/pdf" => Ok(RenderFormat::Pdf),
            other => Err(RenderError::Encoding(format!("unsupported format: {}", other))),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoded output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub format: RenderFormat,
}

impl Rendered {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode `list` as `format`. Only PNG output is rasterized; `metadata`
/// only applies to PDF output.
pub fn encode(
    list: DisplayList,
    format: RenderFormat,
    metadata: &PdfMetadata,
) -> Result<Rendered, RenderError> {
    let bytes = match format {
        RenderFormat::Png => png::encode_png(&Surface::composite(list)?)?,
        RenderFormat::Pdf => pdf::encode_pdf(&list, metadata)?,
    };
    Ok(Rendered { bytes, format })
}
