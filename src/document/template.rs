//! Stored template and certificate records, and their merge into a
//! render-ready [`Document`].

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{DEFAULT_BACKGROUND_COLOUR, Document, DocumentContext, Field, Point};
use crate::error::RenderError;

fn default_background_colour() -> String {
    DEFAULT_BACKGROUND_COLOUR.to_string()
}

/// A reusable certificate layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    /// Display title, defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Surface size in pixels (`x` = width, `y` = height).
    pub dimensions: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default = "default_background_colour")]
    pub background_colour: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A named value supplied by a certificate for one template field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// One issued certificate: a template reference plus per-field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Name of the template this certificate was issued from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl Template {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    fn base_document(&self, context: DocumentContext) -> Document {
        Document {
            width: self.dimensions.x,
            height: self.dimensions.y,
            background_image: self.background.clone(),
            background_colour: self.background_colour.clone(),
            // Deep copy: the render owns its fields, the template is never touched.
            fields: self.fields.clone(),
            context,
        }
    }
}

impl Certificate {
    /// Uid of this certificate, generating one when absent.
    pub fn uid_or_generate(&self) -> String {
        self.uid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

impl Document {
    /// Merge a certificate's values into a copy of its template.
    ///
    /// Values for placeholder and fixed fields are ignored. Fields that end
    /// up with neither a value nor a default are skipped.
    pub fn from_certificate(template: &Template, certificate: &Certificate) -> Result<Self, RenderError> {
        if let Some(name) = &certificate.template {
            if name != &template.name {
                return Err(RenderError::InvalidDocument(format!(
                    "certificate belongs to template '{}', not '{}'",
                    name, template.name
                )));
            }
        }

        let now = Utc::now();
        let context = DocumentContext {
            template_title: template.title().to_string(),
            template_date: template.date.unwrap_or(now),
            title: certificate
                .title
                .clone()
                .unwrap_or_else(|| "Certificate".to_string()),
            date: certificate.date.unwrap_or(now),
            uid: certificate.uid_or_generate(),
        };

        let mut provided: HashMap<&str, &serde_json::Value> = HashMap::new();
        for entry in &certificate.values {
            if provided.insert(entry.name.as_str(), &entry.value).is_some() {
                return Err(RenderError::InvalidDocument(format!(
                    "duplicate values for the field '{}'",
                    entry.name
                )));
            }
        }

        let mut doc = template.base_document(context);

        for field in &mut doc.fields {
            let Some(raw) = provided.remove(field.name.as_str()) else {
                if !field.kind.has_value() {
                    field.skip = true;
                }
                continue;
            };

            if field.placeholder || field.fixed {
                debug!("Ignoring certificate value for fixed/placeholder field '{}'", field.name);
                continue;
            }

            field.kind.set_json_value(raw).map_err(|e| {
                RenderError::InvalidDocument(format!("value for field '{}': {}", field.name, e))
            })?;
        }

        for name in provided.keys() {
            warn!("Certificate value '{}' has no matching template field", name);
        }

        Ok(doc)
    }

    /// Render-ready copy of a template on its own, for previews.
    ///
    /// Placeholder flags are cleared so tokens show literally, and nothing
    /// is skipped: fields without values fall back to their labels.
    pub fn preview(template: &Template) -> Self {
        let date = template.date.unwrap_or_else(Utc::now);
        let context = DocumentContext {
            template_title: template.title().to_string(),
            template_date: date,
            title: template.title().to_string(),
            date,
            uid: String::new(),
        };

        let mut doc = template.base_document(context);
        for field in &mut doc.fields {
            field.placeholder = false;
            field.skip = false;
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DateValue, FieldKind};
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        serde_json::from_str(
            r#"{
                "name": "course",
                "title": "Course Completion",
                "dimensions": {"x": 2000, "y": 1000},
                "background": "backgrounds/course.png",
                "fields": [
                    {"name": "recipient", "type": "String", "position": {"x": 1000, "y": 500}},
                    {"name": "score", "type": "Number", "defaultValue": 0},
                    {"name": "passed", "type": "Boolean"},
                    {"name": "uid", "type": "String", "placeholder": true, "value": "ID: CERTIFICATE_UID"},
                    {"name": "issued", "type": "Date", "placeholder": true, "value": "CERTIFICATE_DATE"},
                    {"name": "seal", "type": "Image", "fixed": true, "value": "seal.png",
                     "image": {"size": {"x": 100, "y": 100}}}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_merge_assigns_values_and_skips_empty() {
        let certificate: Certificate = serde_json::from_str(
            r#"{"uid": "abc-123", "title": "Well done", "template": "course",
                "values": [{"name": "recipient", "value": "Ada"}]}"#,
        )
        .unwrap();

        let doc = Document::from_certificate(&template(), &certificate).unwrap();
        assert_eq!(doc.width, 2000.0);
        assert_eq!(doc.background_image.as_deref(), Some("backgrounds/course.png"));
        assert_eq!(doc.background_colour, "white");
        assert_eq!(doc.context.uid, "abc-123");
        assert_eq!(doc.context.title, "Well done");
        assert_eq!(doc.context.template_title, "Course Completion");

        let recipient = doc.field("recipient").unwrap();
        assert!(matches!(&recipient.kind, FieldKind::String { value: Some(v), .. } if v == "Ada"));
        assert!(!recipient.skip);

        // Default value only: still drawn.
        assert!(!doc.field("score").unwrap().skip);
        // Nothing at all: skipped.
        assert!(doc.field("passed").unwrap().skip);
        // Placeholders carry their own value.
        assert!(!doc.field("uid").unwrap().skip);
    }

    #[test]
    fn test_merge_does_not_touch_template() {
        let template = template();
        let certificate = Certificate {
            values: vec![FieldValue {
                name: "recipient".into(),
                value: serde_json::json!("Ada"),
            }],
            ..Default::default()
        };
        let _ = Document::from_certificate(&template, &certificate).unwrap();
        assert!(matches!(
            &template.fields[0].kind,
            FieldKind::String { value: None, .. }
        ));
    }

    #[test]
    fn test_merge_defaults_for_missing_metadata() {
        let doc = Document::from_certificate(&template(), &Certificate::default()).unwrap();
        assert_eq!(doc.context.title, "Certificate");
        assert_eq!(doc.context.uid.len(), 36);
    }

    #[test]
    fn test_merge_ignores_fixed_and_placeholder_values() {
        let certificate: Certificate = serde_json::from_str(
            r#"{"values": [
                {"name": "seal", "value": "other.png"},
                {"name": "issued", "value": "2020-01-01"}
            ]}"#,
        )
        .unwrap();
        let doc = Document::from_certificate(&template(), &certificate).unwrap();
        assert!(matches!(
            &doc.field("seal").unwrap().kind,
            FieldKind::Image { value: Some(v), .. } if v == "seal.png"
        ));
        assert!(matches!(
            &doc.field("issued").unwrap().kind,
            FieldKind::Date { value: Some(DateValue::Token(_)), .. }
        ));
    }

    #[test]
    fn test_merge_rejects_bad_values() {
        let wrong_type: Certificate =
            serde_json::from_str(r#"{"values": [{"name": "score", "value": "lots"}]}"#).unwrap();
        assert!(matches!(
            Document::from_certificate(&template(), &wrong_type),
            Err(RenderError::InvalidDocument(_))
        ));

        let duplicate: Certificate = serde_json::from_str(
            r#"{"values": [{"name": "recipient", "value": "A"}, {"name": "recipient", "value": "B"}]}"#,
        )
        .unwrap();
        assert!(Document::from_certificate(&template(), &duplicate).is_err());

        let other_template: Certificate = serde_json::from_str(r#"{"template": "other"}"#).unwrap();
        assert!(Document::from_certificate(&template(), &other_template).is_err());
    }

    #[test]
    fn test_preview_clears_placeholders() {
        let doc = Document::preview(&template());
        assert!(doc.fields.iter().all(|f| !f.placeholder && !f.skip));
        assert_eq!(doc.context.title, "Course Completion");
    }

    #[test]
    fn test_dates_flow_into_context() {
        let mut template = template();
        template.date = Some(serde_json::from_str(r#""2023-05-01T08:00:00Z""#).unwrap());
        let certificate: Certificate =
            serde_json::from_str(r#"{"uid": "a", "date": "2024-06-30T12:00:00Z"}"#).unwrap();

        let doc = Document::from_certificate(&template, &certificate).unwrap();
        assert_eq!(doc.context.date.to_rfc3339(), "2024-06-30T12:00:00+00:00");
        assert_eq!(doc.context.template_date.to_rfc3339(), "2023-05-01T08:00:00+00:00");

        let json = serde_json::to_value(&certificate).unwrap();
        assert_eq!(json["date"], "2024-06-30T12:00:00Z");
    }
}
