//! # Placeholder Resolution
//!
//! Fields flagged `placeholder` carry symbolic tokens in their value that are
//! replaced with document metadata at render time.
//!
//! | Token | Source | Allowed field kinds |
//! |-------|--------|---------------------|
//! | `TEMPLATE_TITLE` | template title | String, QR |
//! | `TEMPLATE_DATE` | template date | Date |
//! | `CERTIFICATE_TITLE` | certificate title | String, QR |
//! | `CERTIFICATE_DATE` | certificate date | Date |
//! | `CERTIFICATE_UID` | certificate uid | String, QR |
//!
//! A String or QR value may embed any number of text tokens
//! (`"Issued to CERTIFICATE_UID"`); every occurrence is replaced. A Date
//! field must hold exactly one date token and resolves to the instant itself.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{DateValue, DocumentContext, Field, FieldKind, FieldType};

/// A recognised placeholder token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placeholder {
    TemplateTitle,
    TemplateDate,
    CertificateTitle,
    CertificateDate,
    CertificateUid,
}

/// Value produced by a placeholder getter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderValue {
    Text(String),
    Date(DateTime<Utc>),
}

impl fmt::Display for PlaceholderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderValue::Text(s) => f.write_str(s),
            PlaceholderValue::Date(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::TemplateTitle,
        Placeholder::TemplateDate,
        Placeholder::CertificateTitle,
        Placeholder::CertificateDate,
        Placeholder::CertificateUid,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::TemplateTitle => "TEMPLATE_TITLE",
            Placeholder::TemplateDate => "TEMPLATE_DATE",
            Placeholder::CertificateTitle => "CERTIFICATE_TITLE",
            Placeholder::CertificateDate => "CERTIFICATE_DATE",
            Placeholder::CertificateUid => "CERTIFICATE_UID",
        }
    }

    /// Exact, case-sensitive token lookup.
    pub fn from_token(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == s)
    }

    /// Whether a field of this kind may use the token.
    pub fn accepts(self, field_type: FieldType) -> bool {
        match self {
            Placeholder::TemplateDate | Placeholder::CertificateDate => {
                field_type == FieldType::Date
            }
            Placeholder::TemplateTitle
            | Placeholder::CertificateTitle
            | Placeholder::CertificateUid => {
                matches!(field_type, FieldType::String | FieldType::Qr)
            }
        }
    }

    pub fn get(self, ctx: &DocumentContext) -> PlaceholderValue {
        match self {
            Placeholder::TemplateTitle => PlaceholderValue::Text(ctx.template_title.clone()),
            Placeholder::TemplateDate => PlaceholderValue::Date(ctx.template_date),
            Placeholder::CertificateTitle => PlaceholderValue::Text(ctx.title.clone()),
            Placeholder::CertificateDate => PlaceholderValue::Date(ctx.date),
            Placeholder::CertificateUid => PlaceholderValue::Text(ctx.uid.clone()),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Tokens embedded in a text value that a field of `field_type` may use.
fn embedded_tokens(text: &str, field_type: FieldType) -> impl Iterator<Item = Placeholder> + '_ {
    Placeholder::ALL
        .into_iter()
        .filter(move |p| text.contains(p.token()) && p.accepts(field_type))
}

/// Check whether a field is a well-formed placeholder field.
///
/// The field must be flagged, and its value must either be exactly one
/// compatible token or (for String and QR fields) contain compatible tokens.
pub fn is_valid_placeholder(field: &Field) -> bool {
    if !field.placeholder {
        return false;
    }

    let field_type = field.field_type();
    match &field.kind {
        FieldKind::String { value: Some(v), .. } | FieldKind::Qr { value: Some(v), .. } => {
            embedded_tokens(v, field_type).next().is_some()
        }
        FieldKind::Date {
            value: Some(DateValue::Token(p)),
            ..
        } => p.accepts(field_type),
        _ => false,
    }
}

/// Replace every compatible token in `text` with its context value.
pub fn substitute(text: &str, field_type: FieldType, ctx: &DocumentContext) -> String {
    let mut out = text.to_string();
    for placeholder in embedded_tokens(text, field_type) {
        out = out.replace(placeholder.token(), &placeholder.get(ctx).to_string());
    }
    out
}

/// Resolve a placeholder field's value in place.
///
/// Fields that are not valid placeholders are left untouched.
pub fn resolve(field: &mut Field, ctx: &DocumentContext) {
    if !is_valid_placeholder(field) {
        debug!("Field {:?} is not a valid placeholder, leaving value as-is", field.name);
        return;
    }

    let field_type = field.field_type();
    match &mut field.kind {
        FieldKind::String { value: Some(v), .. } | FieldKind::Qr { value: Some(v), .. } => {
            *v = substitute(v, field_type, ctx);
        }
        FieldKind::Date { value, .. } => {
            if let Some(DateValue::Token(p)) = *value {
                *value = match p.get(ctx) {
                    PlaceholderValue::Date(t) => Some(DateValue::Instant(t)),
                    PlaceholderValue::Text(_) => *value,
                };
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Point, QrFormat, Size, TextFormat};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn context() -> DocumentContext {
        DocumentContext {
            template_title: "Course".into(),
            template_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            title: "Completion".into(),
            date: Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap(),
            uid: "abc-123".into(),
        }
    }

    fn date_field(value: DateValue) -> Field {
        Field::new(
            "issued",
            Point::default(),
            FieldKind::Date {
                text_format: TextFormat::default(),
                date_format: None,
                value: Some(value),
                default_value: None,
            },
        )
        .placeholder()
    }

    #[test]
    fn test_token_round_trip() {
        for p in Placeholder::ALL {
            assert_eq!(Placeholder::from_token(p.token()), Some(p));
        }
        assert_eq!(Placeholder::from_token("certificate_uid"), None);
    }

    #[test]
    fn test_substring_replacement() {
        let mut field = Field::text("greeting", Point::default(), Some("Hello CERTIFICATE_UID!")).placeholder();
        resolve(&mut field, &context());
        match field.kind {
            FieldKind::String { value, .. } => assert_eq!(value.as_deref(), Some("Hello abc-123!")),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let text = substitute(
            "CERTIFICATE_UID/TEMPLATE_TITLE/CERTIFICATE_UID",
            FieldType::Qr,
            &context(),
        );
        assert_eq!(text, "abc-123/Course/abc-123");
    }

    #[test]
    fn test_date_tokens_are_not_substituted_into_text() {
        let text = substitute("On CERTIFICATE_DATE", FieldType::String, &context());
        assert_eq!(text, "On CERTIFICATE_DATE");
    }

    #[test]
    fn test_exact_date_match_keeps_instant() {
        let ctx = context();
        let mut field = date_field(DateValue::Token(Placeholder::CertificateDate));
        resolve(&mut field, &ctx);
        match field.kind {
            FieldKind::Date { value, .. } => assert_eq!(value, Some(DateValue::Instant(ctx.date))),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_validity() {
        assert!(is_valid_placeholder(&date_field(DateValue::Token(Placeholder::TemplateDate))));
        assert!(!is_valid_placeholder(&date_field(DateValue::Token(Placeholder::CertificateUid))));
        assert!(!is_valid_placeholder(&date_field(DateValue::Now)));

        let unflagged = Field::text("t", Point::default(), Some("CERTIFICATE_UID"));
        assert!(!is_valid_placeholder(&unflagged));

        let no_token = Field::text("t", Point::default(), Some("plain")).placeholder();
        assert!(!is_valid_placeholder(&no_token));

        let qr = Field::new(
            "code",
            Point::default(),
            FieldKind::Qr {
                qr: QrFormat {
                    size: Size::new(10.0, 10.0),
                    margin: 1,
                },
                value: Some("https://example.invalid/CERTIFICATE_UID".into()),
                default_value: None,
            },
        )
        .placeholder();
        assert!(is_valid_placeholder(&qr));
    }
}
