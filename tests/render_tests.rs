//! End-to-end rendering tests.
//!
//! These exercise the public API from template JSON through to decoded PNG
//! pixels and parsed PDF objects.

use chrono::{TimeZone, Utc};
use lopdf::content::Content;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use rema::config::DEFAULT_MAX_SURFACE_DIMENSION;
use rema::document::{DateValue, DocumentContext, Point};
use rema::normalize::normalize;
use rema::{Certificate, Document, Field, FieldKind, RenderConfig, RenderFormat, Renderer, Template, placeholder};

fn renderer() -> Renderer {
    Renderer::new(RenderConfig::default())
}

fn template() -> Template {
    serde_json::from_str(
        r##"{
            "name": "course",
            "title": "Course Completion",
            "dimensions": {"x": 400, "y": 200},
            "backgroundColour": "#336699",
            "fields": [
                {"name": "recipient", "type": "String", "position": {"x": 200, "y": 100},
                 "textFormat": {"fontSize": 24, "align": "center", "selectable": true}},
                {"name": "uid", "type": "String", "placeholder": true, "value": "No. CERTIFICATE_UID",
                 "position": {"x": 200, "y": 150},
                 "textFormat": {"fontSize": "12px", "align": "center", "selectable": true}},
                {"name": "issued", "type": "Date", "dateFormat": "%d %B %Y",
                 "position": {"x": 10, "y": 190},
                 "textFormat": {"selectable": true}},
                {"name": "code", "type": "QR", "placeholder": true, "value": "CERTIFICATE_UID",
                 "position": {"x": 340, "y": 140}, "qr": {"size": {"x": 50, "y": 50}}}
            ]
        }"##,
    )
    .unwrap()
}

fn certificate() -> Certificate {
    serde_json::from_str(
        r#"{
            "uid": "abc-123",
            "title": "Ada's certificate",
            "template": "course",
            "values": [
                {"name": "recipient", "value": "Ada Lovelace"},
                {"name": "issued", "value": "2024-06-30"}
            ]
        }"#,
    )
    .unwrap()
}

fn pdf_texts(bytes: &[u8]) -> Vec<String> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
        .collect()
}

fn pdf_info(bytes: &[u8], key: &[u8]) -> Vec<u8> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_object(info_ref).unwrap().as_dict().unwrap();
    info.get(key).unwrap().as_str().unwrap().to_vec()
}

#[test]
fn test_normalize_scenario() {
    let mut doc = Document::new(20000.0, 10000.0).with_field(Field::text("a", Point::new(1000.0, 500.0), None));
    let conversion = normalize(&mut doc, DEFAULT_MAX_SURFACE_DIMENSION).unwrap();

    assert!((conversion - 0.4915).abs() < 1e-9);
    assert!((doc.width - 9830.0).abs() < 1e-9);
    assert!((doc.height - 4915.0).abs() < 1e-9);
    assert!((doc.fields[0].position.x - 491.5).abs() < 1e-9);
    assert!((doc.fields[0].position.y - 245.75).abs() < 1e-9);
}

#[test]
fn test_placeholder_scenarios() {
    let date = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let ctx = DocumentContext {
        uid: "abc-123".to_string(),
        date,
        ..Default::default()
    };

    let mut greeting = Field::text("greeting", Point::default(), Some("Hello CERTIFICATE_UID!")).placeholder();
    placeholder::resolve(&mut greeting, &ctx);
    assert!(matches!(
        &greeting.kind,
        FieldKind::String { value: Some(v), .. } if v == "Hello abc-123!"
    ));

    let mut issued = Field::new(
        "issued",
        Point::default(),
        FieldKind::Date {
            text_format: Default::default(),
            date_format: None,
            value: Some("CERTIFICATE_DATE".parse().unwrap()),
            default_value: None,
        },
    )
    .placeholder();
    placeholder::resolve(&mut issued, &ctx);
    assert!(matches!(
        issued.kind,
        FieldKind::Date { value: Some(DateValue::Instant(t)), .. } if t == date
    ));
}

#[test]
fn test_certificate_png() {
    let rendered = renderer()
        .render_certificate(&template(), &certificate(), RenderFormat::Png)
        .unwrap();
    assert_eq!(rendered.content_type(), "image/png");

    let decoded = image::load_from_memory(&rendered.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (400, 200));
    // Nothing is drawn in the top-left corner but the background.
    assert_eq!(decoded.get_pixel(2, 2).0, [0x33, 0x66, 0x99, 255]);
}

#[test]
fn test_certificate_pdf_text_and_metadata() {
    let rendered = renderer()
        .render_certificate(&template(), &certificate(), RenderFormat::Pdf)
        .unwrap();
    assert_eq!(rendered.content_type(), "application/pdf");

    assert_eq!(
        pdf_texts(&rendered.bytes),
        vec!["Ada Lovelace", "No. abc-123", "30 June 2024"]
    );
    assert_eq!(pdf_info(&rendered.bytes, b"Title"), b"Ada's certificate");
    assert_eq!(pdf_info(&rendered.bytes, b"Creator"), b"Rema");
}

#[test]
fn test_certificate_pdf_is_vector() {
    let rendered = renderer()
        .render_certificate(&template(), &certificate(), RenderFormat::Pdf)
        .unwrap();
    let doc = lopdf::Document::load_mem(&rendered.bytes).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    let operators: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();

    // Background rectangle and glyph outlines.
    for expected in ["re", "m", "f"] {
        assert!(operators.contains(&expected), "missing {}", expected);
    }

    // The only bitmap is the QR code, never a page-sized raster.
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let xobjects = page
        .get(b"Resources")
        .and_then(lopdf::Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(lopdf::Object::as_dict)
        .unwrap();
    assert_eq!(xobjects.len(), 1);
    for (_, reference) in xobjects.iter() {
        let image = doc.get_object(reference.as_reference().unwrap()).unwrap().as_stream().unwrap();
        assert_ne!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 400);
    }
}

#[test]
fn test_preview_shows_labels_and_tokens() {
    let rendered = renderer().render_preview(&template(), RenderFormat::Pdf).unwrap();
    let texts = pdf_texts(&rendered.bytes);

    // The undated Date field shows today's date, so only its presence is checked.
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[..2], ["recipient", "No. CERTIFICATE_UID"]);
    assert_eq!(pdf_info(&rendered.bytes, b"Title"), b"Course Completion");
}

#[test]
fn test_missing_value_fields_are_skipped() {
    let certificate: Certificate = serde_json::from_str(r#"{"uid": "x"}"#).unwrap();
    let rendered = renderer()
        .render_certificate(&template(), &certificate, RenderFormat::Pdf)
        .unwrap();
    // Only the placeholder field has its own value.
    assert_eq!(pdf_texts(&rendered.bytes), vec!["No. x"]);
}

#[test]
fn test_boolean_and_empty_image_render() {
    let template: Template = serde_json::from_str(
        r#"{
            "name": "flags",
            "dimensions": {"x": 100, "y": 100},
            "fields": [
                {"name": "yes", "type": "Boolean", "value": true, "position": {"x": 10, "y": 20}},
                {"name": "photo", "type": "Image", "position": {"x": 50, "y": 50},
                 "image": {"size": {"x": 40, "y": 40}}}
            ]
        }"#,
    )
    .unwrap();

    let rendered = renderer().render_preview(&template, RenderFormat::Png).unwrap();
    let decoded = image::load_from_memory(&rendered.bytes).unwrap().to_rgba8();

    // White background inverted to black under the empty image slot.
    assert_eq!(decoded.get_pixel(70, 70).0, [0, 0, 0, 255]);
    assert_eq!(decoded.get_pixel(95, 5).0, [255, 255, 255, 255]);
}

#[test]
fn test_malformed_date_pattern_falls_back_to_iso() {
    let mut template = template();
    for field in &mut template.fields {
        if let FieldKind::Date { date_format, .. } = &mut field.kind {
            *date_format = Some("%Q".to_string());
        }
    }

    let rendered = renderer()
        .render_certificate(&template, &certificate(), RenderFormat::Pdf)
        .unwrap();
    assert!(pdf_texts(&rendered.bytes).contains(&"2024-06-30T00:00:00.000Z".to_string()));
}

#[test]
fn test_oversized_document_is_scaled() {
    let renderer = Renderer::new(RenderConfig::default().with_max_surface_dimension(50));
    let rendered = renderer.render(Document::new(200.0, 100.0), RenderFormat::Png).unwrap();
    let decoded = image::load_from_memory(&rendered.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 25));
}

#[test]
fn test_mismatched_template_is_rejected() {
    let mut certificate = certificate();
    certificate.template = Some("other".to_string());
    assert!(matches!(
        renderer().render_certificate(&template(), &certificate, RenderFormat::Png),
        Err(rema::RenderError::InvalidDocument(_))
    ));
}

#[tokio::test]
async fn test_render_async_in_parallel() {
    let renderer = Arc::new(renderer());
    let template = template();

    let tasks: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|uid| {
            let certificate = Certificate {
                uid: Some(uid.to_string()),
                ..certificate()
            };
            let doc = Document::from_certificate(&template, &certificate).unwrap();
            tokio::spawn(Arc::clone(&renderer).render_async(doc, RenderFormat::Pdf))
        })
        .collect();

    for (task, uid) in tasks.into_iter().zip(["a", "b", "c"]) {
        let rendered = task.await.unwrap().unwrap();
        assert!(pdf_texts(&rendered.bytes).contains(&format!("No. {}", uid)));
    }
}
