//! # Render Pipeline
//!
//! [`Renderer`] runs a document through every stage in order:
//!
//! 1. validate the document
//! 2. scale it down to the maximum surface dimension
//! 3. resolve placeholders and values, building the display list
//! 4. encode the display list: rasterized for PNG, as vector content for PDF
//!
//! Each call owns its document and output; a `Renderer` holds no mutable
//! state and can be shared across threads behind an `Arc`.
//!
//! ```no_run
//! use rema::{Document, RenderConfig, RenderFormat, Renderer};
//! use rema::document::{Field, Point};
//!
//! let renderer = Renderer::new(RenderConfig::default());
//! let doc = Document::new(800.0, 600.0)
//!     .with_field(Field::text("name", Point::new(400.0, 300.0), Some("Ada")));
//! let rendered = renderer.render(doc, RenderFormat::Png).unwrap();
//! assert_eq!(rendered.content_type(), "image/png");
//! ```

use chrono::Utc;
use log::debug;
use std::sync::Arc;

use crate::assets::{AssetResolver, StaticAssetStore};
use crate::config::RenderConfig;
use crate::document::{Certificate, Document, Template};
use crate::encode::{self, PdfMetadata, RenderFormat, Rendered};
use crate::error::RenderError;
use crate::font;
use crate::normalize::normalize;
use crate::render::{RenderEnv, build_display_list};

/// Renders documents to encoded output.
pub struct Renderer {
    config: RenderConfig,
    assets: Arc<dyn AssetResolver>,
}

impl Renderer {
    /// Renderer reading assets from the configured static directory.
    pub fn new(config: RenderConfig) -> Self {
        let assets = Arc::new(StaticAssetStore::new(config.static_dir.clone()));
        Self { config, assets }
    }

    /// Renderer with a custom asset resolver.
    pub fn with_resolver(config: RenderConfig, assets: Arc<dyn AssetResolver>) -> Self {
        Self { config, assets }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `document` as `format`.
    pub fn render(&self, mut document: Document, format: RenderFormat) -> Result<Rendered, RenderError> {
        self.render_in_place(&mut document, format)
    }

    /// Render `document`, leaving it normalized and with every drawn field's
    /// resolved value recorded on it.
    pub fn render_in_place(
        &self,
        document: &mut Document,
        format: RenderFormat,
    ) -> Result<Rendered, RenderError> {
        document.validate()?;
        normalize(document, self.config.max_surface_dimension);

        let env = RenderEnv {
            resolver: self.assets.as_ref(),
            fonts: font::registry(),
            now: Utc::now(),
        };
        let list = build_display_list(document, &env)?;
        let (width, height) = (list.width, list.height);

        let rendered = encode::encode(list, format, &self.metadata(document))?;
        debug!("Rendered {}x{} {} ({} bytes)", width, height, format, rendered.len());
        Ok(rendered)
    }

    /// Merge `certificate` into `template` and render the result.
    pub fn render_certificate(
        &self,
        template: &Template,
        certificate: &Certificate,
        format: RenderFormat,
    ) -> Result<Rendered, RenderError> {
        let document = Document::from_certificate(template, certificate)?;
        self.render(document, format)
    }

    /// Render a template on its own, tokens and labels shown literally.
    pub fn render_preview(&self, template: &Template, format: RenderFormat) -> Result<Rendered, RenderError> {
        self.render(Document::preview(template), format)
    }

    /// Render on tokio's blocking pool.
    pub async fn render_async(
        self: Arc<Self>,
        document: Document,
        format: RenderFormat,
    ) -> Result<Rendered, RenderError> {
        tokio::task::spawn_blocking(move || self.render(document, format))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }

    fn metadata(&self, document: &Document) -> PdfMetadata {
        let title = if document.context.title.is_empty() {
            &document.context.template_title
        } else {
            &document.context.title
        };
        PdfMetadata::new(title.clone(), self.config.creator.clone())
    }
}

/// Render with configuration taken from the environment.
pub fn render(document: Document, format: RenderFormat) -> Result<Rendered, RenderError> {
    Renderer::new(RenderConfig::from_env()).render(document, format)
}
