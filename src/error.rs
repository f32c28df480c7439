//! # Error Types
//!
//! This module defines the error type returned by every fallible rendering
//! operation. Conditions the renderer recovers from locally (an unreadable
//! background, a bad date pattern, an unknown colour) are logged instead and
//! never surface here.

use thiserror::Error;

/// Main error type for rema operations
#[derive(Debug, Error)]
pub enum RenderError {
    /// Missing or invalid geometry on a field or the surface
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Field-level asset could not be resolved or decoded
    #[error("Asset error: {0}")]
    Asset(String),

    /// Surface could not be serialized to the requested format
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Document, template or certificate data is malformed
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Font file or manifest could not be loaded
    #[error("Font error: {0}")]
    Font(String),

    /// Background render task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
