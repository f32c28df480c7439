//! # Paint Resolution
//!
//! Turns a field's declared [`Style`] into an immutable [`PaintDescriptor`]
//! handed to every draw call. Each field gets a fresh descriptor, so paint
//! settings never carry over from one field to the next.
//!
//! | Style | Composite | Fill |
//! |-------|-----------|------|
//! | colour `"invert"` | difference | white |
//! | colour (CSS) | source-over | the colour |
//! | gradient | source-over | linear gradient, stops in declared order |

pub mod colour;

pub use colour::{Colour, parse_css_colour};

use log::warn;

use crate::document::{Point, Style};

/// Sentinel colour that inverts whatever is underneath.
pub const INVERT: &str = "invert";

/// How new pixels combine with the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Composite {
    #[default]
    SourceOver,
    Difference,
}

/// A colour stop at a fraction along the gradient line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourStop {
    pub fraction: f32,
    pub colour: Colour,
}

/// What a shape is filled with.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Colour),
    Linear {
        start: Point,
        end: Point,
        /// In the order declared; see [`sorted_stops`].
        stops: Vec<ColourStop>,
    },
}

/// Fully resolved paint for one draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintDescriptor {
    pub composite: Composite,
    pub fill: Fill,
}

impl Default for PaintDescriptor {
    fn default() -> Self {
        Self::solid(Colour::BLACK)
    }
}

impl PaintDescriptor {
    pub fn solid(colour: Colour) -> Self {
        Self {
            composite: Composite::SourceOver,
            fill: Fill::Solid(colour),
        }
    }

    /// White under difference blending.
    pub fn invert() -> Self {
        Self {
            composite: Composite::Difference,
            fill: Fill::Solid(Colour::WHITE),
        }
    }

    /// Same composite, different solid colour. Used for text outlines.
    pub fn with_colour(&self, colour: Colour) -> Self {
        Self {
            composite: self.composite,
            fill: Fill::Solid(colour),
        }
    }
}

/// Stops ordered by fraction, clamped to `0..=1`. The sort is stable, so
/// stops sharing a fraction keep their declared order.
pub fn sorted_stops(stops: &[ColourStop]) -> Vec<ColourStop> {
    let mut sorted: Vec<ColourStop> = stops
        .iter()
        .map(|stop| ColourStop {
            fraction: stop.fraction.clamp(0.0, 1.0),
            colour: stop.colour,
        })
        .collect();
    sorted.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
    sorted
}

/// Resolve a CSS colour, keeping `fallback` (and logging) when it does not parse.
pub fn colour_or(value: &str, fallback: Colour) -> Colour {
    match parse_css_colour(value) {
        Some(c) => c,
        None => {
            warn!("Ignoring invalid colour {:?}", value);
            fallback
        }
    }
}

/// Resolve a field style into a paint descriptor.
///
/// No style means the default: opaque black, source-over.
pub fn resolve(style: Option<&Style>) -> PaintDescriptor {
    match style {
        None => PaintDescriptor::default(),
        Some(Style::Colour { colour }) if colour.trim() == INVERT => PaintDescriptor::invert(),
        Some(Style::Colour { colour }) => PaintDescriptor::solid(colour_or(colour, Colour::BLACK)),
        Some(Style::Gradient { gradient }) => {
            let stops = gradient
                .stops
                .iter()
                .filter_map(|stop| match parse_css_colour(&stop.colour) {
                    Some(colour) => Some(ColourStop {
                        fraction: stop.fraction as f32,
                        colour,
                    }),
                    None => {
                        warn!("Dropping gradient stop with invalid colour {:?}", stop.colour);
                        None
                    }
                })
                .collect();

            PaintDescriptor {
                composite: Composite::SourceOver,
                fill: Fill::Linear {
                    start: gradient.start,
                    end: gradient.end,
                    stops,
                },
            }
        }
    }
}
