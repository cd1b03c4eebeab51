//! chromakey-pipeline: Pure color-key matting pipeline (sans-IO).
//!
//! Removes a chosen background color from a still image:
//! key color -> HSV tolerance bounds -> decode -> key mask ->
//! alpha mask -> optional smoothing -> alpha compositing -> PNG.
//!
//! This crate has **no I/O dependencies** and never logs -- it operates
//! on in-memory byte slices and returns typed errors. Reading files,
//! logging, and reporting live in the `chromakey` binary.

pub mod bounds;
pub mod codec;
pub mod color;
pub mod composite;
pub mod diagnostics;
pub mod mask;
pub mod smooth;
pub mod types;

pub use bounds::{ChannelTolerance, HsvBox, ToleranceBounds};
pub use color::{hex_to_hsv, parse_hex, rgb_to_hsv};
pub use types::{
    ColorError, Dimensions, GrayImage, Hsv, KeyError, KeyParams, RgbaImage, StagedResult,
};

/// Remove the key color from an image and return it as PNG bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), a hex key color such as
/// `"#00FF00"`, a sensitivity (nominally 0-100) controlling how far from
/// the key color a pixel may be and still be removed, and a smoothing
/// strength (nominally 0-100) controlling how much the mask edges are
/// softened. The result always has an alpha channel.
///
/// # Pipeline steps
///
/// 1. Parse the key color and derive HSV tolerance bounds
/// 2. Decode image to RGBA
/// 3. Build the key mask (with hue wrap-around) and invert it
/// 4. Optional cleanup (inert) and Gaussian blur of the alpha mask
/// 5. AND the alpha mask into the source alpha
/// 6. Encode as PNG
///
/// # Errors
///
/// Returns [`KeyError::InvalidColor`] if `color_hex` is not 6 hex digits.
/// Returns [`KeyError::Decode`] if the image bytes cannot be decoded.
/// Returns [`KeyError::Encode`] if the result cannot be encoded as PNG.
pub fn process(
    image_bytes: &[u8],
    color_hex: &str,
    sensitivity: f64,
    smoothing: f64,
) -> Result<Vec<u8>, KeyError> {
    let params = KeyParams {
        color: color_hex.to_owned(),
        sensitivity,
        smoothing,
    };
    process_with_params(image_bytes, &params)
}

/// [`process`] with the parameters bundled in a [`KeyParams`].
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_params(image_bytes: &[u8], params: &KeyParams) -> Result<Vec<u8>, KeyError> {
    process_staged(image_bytes, params).map(|staged| staged.png)
}

/// Run the pipeline and keep every intermediate artifact.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(image_bytes: &[u8], params: &KeyParams) -> Result<StagedResult, KeyError> {
    diagnostics::process_staged_with_diagnostics(image_bytes, params, &diagnostics::NoClock)
        .map(|(staged, _)| staged)
}
