//! # Rema - Certificate Rendering Library
//!
//! Rema renders templated documents (certificates, badges, tickets) to PNG
//! or PDF. A template positions typed fields on a fixed-size surface; a
//! certificate supplies the values. It provides:
//!
//! - **Document model**: templates, certificates and typed fields
//! - **Placeholders**: tokens such as `CERTIFICATE_UID` resolved per render
//! - **Rasterization**: text, images, QR codes, gradients and strokes
//! - **Encoding**: RGBA PNG, or vector PDF with an optional selectable text layer
//!
//! ## Quick Start
//!
//! ```no_run
//! use rema::{Certificate, RenderConfig, RenderFormat, Renderer, Template};
//!
//! let template: Template = serde_json::from_str(&std::fs::read_to_string("course.json")?)?;
//! let certificate: Certificate = serde_json::from_str(r#"{
//!     "values": [{"name": "recipient", "value": "Ada Lovelace"}]
//! }"#)?;
//!
//! rema::font::register_fonts(None, "static".as_ref());
//! let renderer = Renderer::new(RenderConfig::from_env());
//! let pdf = renderer.render_certificate(&template, &certificate, RenderFormat::Pdf)?;
//! std::fs::write("certificate.pdf", &pdf.bytes)?;
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Templates, certificates, fields and validation |
//! | [`placeholder`] | Placeholder tokens and substitution |
//! | [`normalize`] | Downscaling oversized documents |
//! | [`paint`] | Colours, gradients and blend modes |
//! | [`font`] | Font registry and text layout |
//! | [`render`] | Field rendering into a display list |
//! | [`surface`] | Rasterization for PNG output |
//! | [`encode`] | PNG and PDF output |
//! | [`pipeline`] | The end-to-end [`Renderer`] |
//! | [`assets`] | Inline and static asset loading |
//! | [`config`] | Render configuration |
//! | [`error`] | Error types |

pub mod assets;
pub mod config;
pub mod document;
pub mod encode;
pub mod error;
pub mod font;
pub mod normalize;
pub mod paint;
pub mod pipeline;
pub mod placeholder;
pub mod qr;
pub mod render;
pub mod surface;

// Re-exports for convenience
pub use config::RenderConfig;
pub use document::{Certificate, Document, Field, FieldKind, Template};
pub use encode::{RenderFormat, Rendered};
pub use error::RenderError;
pub use pipeline::{Renderer, render};
pub use placeholder::Placeholder;
