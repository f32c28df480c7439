//! # Document Model
//!
//! A [`Document`] is the request-local unit of rendering: surface size,
//! background, an ordered list of [`Field`]s and the metadata placeholders
//! resolve against. It is built fresh for every render from a stored
//! [`Template`] (and optionally a [`Certificate`]) and owned exclusively by
//! that render, so normalisation and placeholder resolution can mutate it in
//! place.
//!
//! ```
//! use rema::document::{Certificate, Document, Template};
//!
//! let template: Template = serde_json::from_str(r#"{
//!     "name": "course",
//!     "dimensions": {"x": 800, "y": 600},
//!     "fields": [
//!         {"name": "recipient", "type": "String", "position": {"x": 400, "y": 300}}
//!     ]
//! }"#).unwrap();
//!
//! let certificate: Certificate = serde_json::from_str(r#"{
//!     "uid": "abc-123",
//!     "values": [{"name": "recipient", "value": "Ada Lovelace"}]
//! }"#).unwrap();
//!
//! let doc = Document::from_certificate(&template, &certificate).unwrap();
//! assert_eq!(doc.width, 800.0);
//! assert_eq!(doc.context.uid, "abc-123");
//! ```

mod template;
pub mod types;

pub use template::{Certificate, FieldValue, Template};
pub use types::*;

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::error::RenderError;
use crate::placeholder;

/// Background colour used when a template does not declare one.
pub const DEFAULT_BACKGROUND_COLOUR: &str = "white";

/// Metadata that placeholder tokens resolve against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentContext {
    pub template_title: String,
    pub template_date: DateTime<Utc>,
    pub title: String,
    pub date: DateTime<Utc>,
    pub uid: String,
}

/// A fully merged, render-ready document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    /// Static-store path or data URI drawn stretched over the whole surface.
    pub background_image: Option<String>,
    /// CSS colour, or `"transparent"` to leave the surface clear.
    pub background_colour: String,
    pub fields: Vec<Field>,
    pub context: DocumentContext,
}

impl Document {
    /// Empty document with a white background.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background_image: None,
            background_colour: DEFAULT_BACKGROUND_COLOUR.to_string(),
            fields: Vec::new(),
            context: DocumentContext::default(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the document is renderable.
    ///
    /// Geometry problems are reported as [`RenderError::Geometry`], everything
    /// else as [`RenderError::InvalidDocument`].
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.width.is_finite() && self.width > 0.0 && self.height.is_finite() && self.height > 0.0)
        {
            return Err(RenderError::Geometry(format!(
                "document dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(RenderError::InvalidDocument(
                    "field names must not be empty".to_string(),
                ));
            }
            if !names.insert(field.name.as_str()) {
                return Err(RenderError::InvalidDocument(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
            if !(field.position.x.is_finite() && field.position.y.is_finite() && field.rotation.is_finite()) {
                return Err(RenderError::Geometry(format!(
                    "field '{}' has a non-finite position or rotation",
                    field.name
                )));
            }
            if let Some(size) = field.kind.size() {
                if !(size.width.is_finite() && size.width > 0.0 && size.height.is_finite() && size.height > 0.0) {
                    return Err(RenderError::Geometry(format!(
                        "{} field '{}' needs a positive size, got {}x{}",
                        field.field_type(),
                        field.name,
                        size.width,
                        size.height
                    )));
                }
            }
            if let Some(Style::Gradient { gradient }) =
                field.kind.text_format().and_then(|tf| tf.style.as_ref())
            {
                if gradient.stops.len() < 2 {
                    return Err(RenderError::InvalidDocument(format!(
                        "gradient on field '{}' needs at least two stops",
                        field.name
                    )));
                }
            }
            if field.placeholder && !placeholder::is_valid_placeholder(field) {
                return Err(RenderError::InvalidDocument(format!(
                    "field '{}' is marked as a placeholder but its value is not a valid placeholder for a {} field",
                    field.name,
                    field.field_type()
                )));
            }
        }

        Ok(())
    }
}
