//! # Font Registry
//!
//! Fonts are registered once per process from a JSON manifest shared with
//! other static items:
//!
//! ```json
//! [
//!   {"type": "font", "path": "fonts/Roboto-Regular.ttf", "family": "Roboto"},
//!   {"type": "image", "path": "backgrounds/blue.png"}
//! ]
//! ```
//!
//! Only `"font"` items are loaded; paths resolve against the static dir.
//! DejaVu Sans Mono is embedded and serves as the default face and as the
//! fallback for any family the registry does not know.

pub mod layout;

pub use layout::{TextRun, layout_text};

use ab_glyph::FontArc;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RenderError;

/// File name of the manifest looked up in the static dir by default.
pub const DEFAULT_MANIFEST: &str = "items.json";

static DEFAULT_FONT: OnceLock<FontArc> = OnceLock::new();
static REGISTRY: FontSlot = FontSlot::new();

/// The embedded monospace face.
pub fn default_font() -> &'static FontArc {
    DEFAULT_FONT.get_or_init(|| {
        FontArc::try_from_slice(include_bytes!("fonts/DejaVuSansMono.ttf"))
            .expect("Failed to load embedded DejaVu Sans Mono")
    })
}

/// A `{path, family}` pair from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontEntry {
    pub path: String,
    pub family: String,
}

#[derive(Debug, Deserialize)]
struct ManifestItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    family: Option<String>,
}

/// Read the font entries of a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<FontEntry>, RenderError> {
    let raw = std::fs::read_to_string(path)?;
    parse_manifest(&raw)
}

/// Parse manifest JSON, keeping only complete `"font"` items.
pub fn parse_manifest(raw: &str) -> Result<Vec<FontEntry>, RenderError> {
    let items: Vec<ManifestItem> = serde_json::from_str(raw)
        .map_err(|e| RenderError::Font(format!("invalid font manifest: {}", e)))?;

    Ok(items
        .into_iter()
        .filter(|item| item.kind == "font")
        .filter_map(|item| match (item.path, item.family) {
            (Some(path), Some(family)) => Some(FontEntry { path, family }),
            (path, _) => {
                warn!("Skipping font manifest entry without path/family: {:?}", path);
                None
            }
        })
        .collect())
}

/// Family names mapped to loaded faces.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    families: HashMap<String, FontArc>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every entry relative to `static_dir`. Unreadable fonts are
    /// skipped with a warning.
    pub fn from_entries(entries: &[FontEntry], static_dir: &Path) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            let path = static_dir.join(entry.path.trim_start_matches('/'));
            match load_font_file(&path) {
                Ok(font) => registry.insert(&entry.family, font),
                Err(e) => warn!("Skipping font '{}': {}", entry.family, e),
            }
        }
        registry
    }

    pub fn insert(&mut self, family: &str, font: FontArc) {
        self.families.insert(family.trim().to_lowercase(), font);
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Face for a CSS family list such as `"'Open Sans', Arial, serif"`.
    ///
    /// The first registered family wins; generic or unknown families fall
    /// back to the embedded default.
    pub fn lookup(&self, family_list: &str) -> &FontArc {
        family_list
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase())
            .find_map(|name| self.families.get(&name))
            .unwrap_or_else(|| default_font())
    }
}

fn load_font_file(path: &Path) -> Result<FontArc, RenderError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| RenderError::Font(format!("{}: {}", path.display(), e)))
}

/// A registry built at most once, with an empty stand-in for lookups made
/// before registration.
struct FontSlot {
    registered: OnceLock<FontRegistry>,
    unregistered: OnceLock<FontRegistry>,
    used_unregistered: AtomicBool,
}

impl FontSlot {
    const fn new() -> Self {
        Self {
            registered: OnceLock::new(),
            unregistered: OnceLock::new(),
            used_unregistered: AtomicBool::new(false),
        }
    }

    fn register(&self, manifest: Option<&Path>, static_dir: &Path) -> &FontRegistry {
        if let Some(existing) = self.registered.get() {
            warn!(
                "Fonts already registered ({} families), ignoring later registration",
                existing.len()
            );
            return existing;
        }
        if self.used_unregistered.load(Ordering::Relaxed) {
            warn!("Fonts registered after first use; earlier renders used the default face only");
        }

        self.registered.get_or_init(|| {
            let manifest_path = manifest
                .map(Path::to_path_buf)
                .unwrap_or_else(|| static_dir.join(DEFAULT_MANIFEST));

            let entries = if manifest.is_none() && !manifest_path.exists() {
                debug!("No font manifest at {}", manifest_path.display());
                Vec::new()
            } else {
                match load_manifest(&manifest_path) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("Could not read font manifest {}: {}", manifest_path.display(), e);
                        Vec::new()
                    }
                }
            };

            let registry = FontRegistry::from_entries(&entries, static_dir);
            info!("Registered {} font families", registry.len());
            registry
        })
    }

    fn get(&self) -> &FontRegistry {
        match self.registered.get() {
            Some(registry) => registry,
            None => {
                self.used_unregistered.store(true, Ordering::Relaxed);
                self.unregistered.get_or_init(FontRegistry::new)
            }
        }
    }
}

/// Register the process-wide fonts.
///
/// `manifest` defaults to `items.json` in `static_dir`; a missing default
/// manifest simply leaves only the embedded face. Only the first call does
/// any work, later calls return the registry built by the first.
pub fn register_fonts(manifest: Option<&Path>, static_dir: &Path) -> &'static FontRegistry {
    REGISTRY.register(manifest, static_dir)
}

/// The process-wide registry. Until [`register_fonts`] runs this is an
/// empty registry, so every family resolves to the embedded face.
pub fn registry() -> &'static FontRegistry {
    REGISTRY.get()
}
