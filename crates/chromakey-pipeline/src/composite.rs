//! Merge the alpha mask into the source image.

use image::Rgba;

use crate::types::{GrayImage, RgbaImage};

/// Combine `image`'s alpha channel with `alpha_mask`.
///
/// The output alpha is the bitwise AND of the source alpha and the mask,
/// so a pixel that was already transparent stays transparent no matter
/// what the mask says. RGB channels are copied unchanged.
///
/// `alpha_mask` must have the same dimensions as `image`; pixels outside
/// the mask are treated as opaque.
#[must_use = "returns the composited image"]
pub fn apply_alpha_mask(image: &RgbaImage, alpha_mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let m = alpha_mask
            .get_pixel_checked(x, y)
            .map_or(u8::MAX, |p| p.0[0]);
        Rgba([r, g, b, a & m])
    })
}
