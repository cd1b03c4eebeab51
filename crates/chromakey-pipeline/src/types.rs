//! Shared types for the chromakey matting pipeline.

use serde::{Deserialize, Serialize};

use crate::bounds::ToleranceBounds;

/// Re-export `GrayImage` so downstream crates can reference mask data
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the decoded
/// and composited images without depending on `image` directly.
pub use image::RgbaImage;

/// A color in hue/saturation/value space.
///
/// Hue uses the half-circle scale `0..=179` (one unit per two degrees).
/// Saturation and value span the full `0..=255` byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue angle in half-degrees, `0..=179`.
    pub hue: u8,
    /// Saturation, `0..=255`.
    pub saturation: u8,
    /// Value (brightness), `0..=255`.
    pub value: u8,
}

impl Hsv {
    /// Largest representable hue on the half-circle scale.
    pub const MAX_HUE: u8 = 179;

    /// Create a new HSV triple.
    #[must_use]
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Per-call keying parameters.
///
/// Neither `sensitivity` nor `smoothing` is clamped. Values outside
/// `0..=100` are accepted: larger sensitivities widen the tolerance box
/// until it saturates at the channel limits, negative sensitivities
/// shrink it until it matches nothing, and non-positive smoothing
/// disables edge softening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyParams {
    /// Key color as a hex string, with or without a leading `#`.
    pub color: String,

    /// Tolerance width around the key color, nominally `0..=100`.
    pub sensitivity: f64,

    /// Edge softening strength, nominally `0..=100`.
    pub smoothing: f64,
}

impl KeyParams {
    /// Default key color (pure green).
    pub const DEFAULT_COLOR: &'static str = "#00FF00";
    /// Default sensitivity.
    pub const DEFAULT_SENSITIVITY: f64 = 50.0;
    /// Default smoothing (disabled).
    pub const DEFAULT_SMOOTHING: f64 = 0.0;
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.to_owned(),
            sensitivity: Self::DEFAULT_SENSITIVITY,
            smoothing: Self::DEFAULT_SMOOTHING,
        }
    }
}

/// Result of running the pipeline with all intermediate artifacts kept.
///
/// Each field captures the output of one logical stage so callers can
/// inspect or export the masks alongside the final image.
///
/// Does not derive `PartialEq`; compare the raster fields with
/// `as_raw()` instead.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Key color in HSV space.
    pub target: Hsv,
    /// Tolerance boxes derived from `target` and the sensitivity.
    pub bounds: ToleranceBounds,
    /// Decoded source image, converted to RGBA (alpha 255 when absent).
    pub original: RgbaImage,
    /// Binary key mask: 255 where the key color matched, 0 elsewhere.
    pub keyed: GrayImage,
    /// Final alpha mask after inversion, cleanup, and optional blur.
    pub alpha_mask: GrayImage,
    /// Blur kernel size applied to the alpha mask (`None` when skipped).
    pub blur_kernel: Option<u32>,
    /// Source image with the alpha mask merged into its alpha channel.
    pub composited: RgbaImage,
    /// `composited` encoded as PNG.
    pub png: Vec<u8>,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Reasons a hex color string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    /// The string does not contain exactly six hex digits.
    #[error("expected 6 hex digits, found {0}")]
    WrongLength(usize),

    /// The string contains a character that is not a hex digit.
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}

/// Errors that can occur while keying an image.
///
/// Every variant aborts the whole call; no partial image is produced.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key color is not a valid 6-digit hex string.
    #[error("invalid color {input:?}: {source}")]
    InvalidColor {
        /// The rejected input, verbatim.
        input: String,
        /// Why it was rejected.
        source: ColorError,
    },

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Failed to encode the result as PNG.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}
