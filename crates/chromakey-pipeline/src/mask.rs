//! Key mask construction.
//!
//! [`key_mask`] marks every pixel whose HSV color falls inside the
//! tolerance bounds as background (255). [`invert_mask`] turns that into
//! an alpha mask, where foreground is opaque (255) and background is
//! transparent (0).

use image::Luma;

use crate::bounds::ToleranceBounds;
use crate::color::rgb_to_hsv;
use crate::types::{GrayImage, RgbaImage};

/// Build the binary key mask: 255 where the key color matched, else 0.
///
/// Only the RGB channels are inspected; the source alpha does not
/// influence matching.
#[must_use = "returns the key mask"]
pub fn key_mask(image: &RgbaImage, bounds: &ToleranceBounds) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let matched = bounds.contains(rgb_to_hsv(r, g, b));
        Luma([if matched { 255 } else { 0 }])
    })
}

/// Invert a mask bitwise (255 ↔ 0).
#[must_use = "returns the inverted mask"]
pub fn invert_mask(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([!mask.get_pixel(x, y).0[0]])
    })
}

/// Count pixels set to 255 in a binary mask.
#[must_use]
pub fn matched_pixel_count(mask: &GrayImage) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}
