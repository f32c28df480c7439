//! # Rema CLI
//!
//! Command-line interface for rendering certificates and template previews.
//!
//! ## Usage
//!
//! ```bash
//! # Render certificates (in parallel) into ./out
//! rema render --template course.json --certificate ada.json grace.json --out-dir out
//!
//! # Render as PDF
//! rema render --template course.json --certificate ada.json --format pdf
//!
//! # Preview a template
//! rema preview --template course.json --out preview.png
//! ```
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use rema::{
    Certificate, RenderConfig, RenderError, RenderFormat, Renderer, Template,
    config::parse_max_dimension, font,
};

/// Rema - certificate rendering utility
#[derive(Parser, Debug)]
#[command(name = "rema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Static asset directory (overrides INTERNAL_STATIC_DIR)
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// Font manifest (defaults to items.json in the static directory)
    #[arg(long, value_name = "FILE")]
    fonts: Option<PathBuf>,

    /// Maximum surface side in pixels (overrides MAX_DIMENSION_OVERRIDE)
    #[arg(long, value_parser = parse_dimension_arg)]
    max_dimension: Option<u32>,

    /// Output format
    #[arg(long, default_value = "png", value_parser = parse_format_arg)]
    format: RenderFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one or more certificates of a template
    Render {
        /// Template JSON file
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Certificate JSON files
        #[arg(long, value_name = "FILE", num_args = 1.., required = true)]
        certificate: Vec<PathBuf>,

        /// Output directory
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Render a template preview
    Preview {
        /// Template JSON file
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Output file (defaults to preview.<format>)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

fn parse_dimension_arg(raw: &str) -> Result<u32, String> {
    parse_max_dimension(raw).ok_or_else(|| format!("expected an integer in 1..=32767, got {}", raw))
}

fn parse_format_arg(raw: &str) -> Result<RenderFormat, String> {
    raw.parse().map_err(|e: RenderError| e.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RenderError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            certificate,
            out_dir,
            common,
        } => {
            let renderer = setup(&common);
            let template: Template = read_json(&template)?;
            std::fs::create_dir_all(&out_dir)?;

            let failures: Vec<(PathBuf, RenderError)> = certificate
                .par_iter()
                .filter_map(|path| {
                    render_one(&renderer, &template, path, &out_dir, common.format)
                        .err()
                        .map(|e| (path.clone(), e))
                })
                .collect();

            for (path, e) in &failures {
                error!("{}: {}", path.display(), e);
            }
            if !failures.is_empty() {
                return Err(RenderError::InvalidDocument(format!(
                    "{} of {} certificates failed to render",
                    failures.len(),
                    certificate.len()
                )));
            }
            println!("Rendered {} certificate(s) to {}", certificate.len(), out_dir.display());
        }

        Commands::Preview { template, out, common } => {
            let renderer = setup(&common);
            let template: Template = read_json(&template)?;
            let rendered = renderer.render_preview(&template, common.format)?;

            let out = out.unwrap_or_else(|| PathBuf::from(format!("preview.{}", common.format.extension())));
            std::fs::write(&out, &rendered.bytes)?;
            println!("Saved {} preview to {}", rendered.content_type(), out.display());
        }
    }

    Ok(())
}

/// Build the renderer and register fonts, flags taking precedence over the environment.
fn setup(common: &CommonArgs) -> Renderer {
    let mut config = RenderConfig::from_env();
    if let Some(dir) = &common.static_dir {
        config = config.with_static_dir(dir);
    }
    if let Some(dim) = common.max_dimension {
        config = config.with_max_surface_dimension(dim);
    }

    font::register_fonts(common.fonts.as_deref(), &config.static_dir);
    info!(
        "Static dir {}, max surface dimension {}",
        config.static_dir.display(),
        config.max_surface_dimension
    );
    Renderer::new(config)
}

fn render_one(
    renderer: &Renderer,
    template: &Template,
    path: &Path,
    out_dir: &Path,
    format: RenderFormat,
) -> Result<(), RenderError> {
    let mut certificate: Certificate = read_json(path)?;
    // Fix the uid up front so the file name matches the rendered one.
    certificate.uid = Some(certificate.uid_or_generate());

    let rendered = renderer.render_certificate(template, &certificate, format)?;
    let uid = certificate.uid.as_deref().unwrap_or_default();
    let out = out_dir.join(certificate_file_name(uid, format));
    std::fs::write(&out, &rendered.bytes)?;
    info!("Wrote {} ({} bytes)", out.display(), rendered.len());
    Ok(())
}

/// `certificate-<uid>.<ext>`, with anything outside `[A-Za-z0-9_-]` in the
/// uid replaced by `_` so the name cannot leave the output directory.
fn certificate_file_name(uid: &str, format: RenderFormat) -> String {
    let safe: String = uid
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    format!("certificate-{}.{}", safe, format.extension())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RenderError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| RenderError::InvalidDocument(format!("{}: {}", path.display(), e)))
}
