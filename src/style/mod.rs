//! Trail styling primitives
//!
//! A trail segment is styled with exactly three attributes: color, diameter,
//! and opacity. Style values are plain data - one [`TrailStyle`] is attached
//! per anchor update and never mutated afterwards. Anything richer (pressure
//! curves, brush textures, prediction-aware tapering) belongs to the
//! application's own renderer, not the delegated path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Style validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    /// Diameter must be a positive, finite value
    #[error("Invalid trail diameter: {0} (must be finite and > 0)")]
    InvalidDiameter(f64),
}

/// Opaque RGBA color value
///
/// The delegated renderer treats this as a pass-through value; no color
/// space conversion or blending decisions happen in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
    /// Alpha channel (0-255)
    pub a: u8,
}

impl Color {
    /// Create an opaque color from RGB components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color from RGBA components
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black, the conventional ink default
    pub const BLACK: Color = Color::rgb(0, 0, 0);
}

/// How a delegated trail segment should look
///
/// Immutable once constructed. [`TrailStyle::new`] clamps opacity into
/// `[0.0, 1.0]` and rejects non-positive or non-finite diameters; styles
/// built through field access (e.g. deserialized from config) are
/// re-validated at the anchor update boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailStyle {
    /// Stroke color
    pub color: Color,
    /// Stroke diameter in region-local units
    pub diameter: f64,
    /// Stroke opacity in [0.0, 1.0]
    pub opacity: f64,
}

impl TrailStyle {
    /// Create a validated style
    ///
    /// Opacity is clamped to `[0.0, 1.0]`. Diameter must be finite and
    /// strictly positive.
    pub fn new(color: Color, diameter: f64, opacity: f64) -> Result<Self, StyleError> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(StyleError::InvalidDiameter(diameter));
        }
        Ok(Self {
            color,
            diameter,
            opacity: opacity.clamp(0.0, 1.0),
        })
    }

    /// Re-check the invariants on an already-built style
    ///
    /// Used by the anchor update operation, which must reject invalid
    /// styles without touching presenter state.
    pub fn validate(&self) -> Result<(), StyleError> {
        if !self.diameter.is_finite() || self.diameter <= 0.0 {
            return Err(StyleError::InvalidDiameter(self.diameter));
        }
        Ok(())
    }
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            diameter: 2.0,
            opacity: 1.0,
        }
    }
}
