//! Edge softening for the alpha mask.
//!
//! A positive smoothing value selects an odd Gaussian kernel size,
//! `trunc(smoothing / 5) * 2 + 1`. Kernels larger than one pixel blur the
//! mask in both directions, turning the hard 0/255 boundary between
//! foreground and background into a ramp.
//!
//! Sigma is derived from the kernel size rather than given explicitly.
//! Kernels up to 7 taps use fixed binomial weights; larger kernels use
//! sampled Gaussian weights with `sigma = 0.3 * ((k - 1) / 2 - 1) + 0.8`.
//!
//! A morphological open/close cleanup pass with kernel size
//! `trunc(smoothing / 20) + 1` is part of the stage but disabled:
//! [`morphological_cleanup`] returns its input unchanged. Enabling it
//! would change which pixels end up transparent.

use image::{ImageBuffer, Luma};

use crate::types::GrayImage;

/// Binomial weights used for small kernels when no sigma is given.
const SMALL_KERNEL_3: [f32; 3] = [0.25, 0.5, 0.25];
const SMALL_KERNEL_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];
const SMALL_KERNEL_7: [f32; 7] = [
    0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
];

/// Output of the smoothing stage.
#[derive(Debug, Clone)]
pub struct SmoothedMask {
    /// Alpha mask after cleanup and blur.
    pub mask: GrayImage,
    /// Cleanup kernel size (`None` when smoothing is disabled).
    pub cleanup_kernel: Option<u32>,
    /// Blur kernel size actually applied (`None` when no blur ran).
    pub blur_kernel: Option<u32>,
}

/// Gaussian kernel size for a smoothing value: always odd, at least 1.
///
/// Non-positive and NaN inputs give 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blur_kernel_size(smoothing: f64) -> u32 {
    let steps = (smoothing / 5.0).trunc() as u32;
    steps.saturating_mul(2).saturating_add(1)
}

/// Morphological cleanup kernel size for a smoothing value.
///
/// Non-positive and NaN inputs give 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cleanup_kernel_size(smoothing: f64) -> u32 {
    ((smoothing / 20.0).trunc() as u32).saturating_add(1)
}

/// Open/close noise cleanup on the alpha mask. Disabled: returns `mask`
/// unchanged for every kernel size.
#[must_use = "returns the cleaned mask"]
pub const fn morphological_cleanup(mask: GrayImage, _kernel_size: u32) -> GrayImage {
    mask
}

/// Normalized 1D Gaussian weights for an odd `size`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    match size {
        0 | 1 => vec![1.0],
        3 => SMALL_KERNEL_3.to_vec(),
        5 => SMALL_KERNEL_5.to_vec(),
        7 => SMALL_KERNEL_7.to_vec(),
        _ => {
            let sigma = 0.3f64.mul_add((f64::from(size) - 1.0).mul_add(0.5, -1.0), 0.8);
            let center = (f64::from(size) - 1.0) / 2.0;
            let scale = -0.5 / (sigma * sigma);
            let weights: Vec<f64> = (0..size)
                .map(|i| {
                    let d = f64::from(i) - center;
                    (scale * d * d).exp()
                })
                .collect();
            let sum: f64 = weights.iter().sum();
            weights.iter().map(|w| (w / sum) as f32).collect()
        }
    }
}

/// Blur a mask with a separable Gaussian of the given odd kernel size.
///
/// Filtering runs in `f32` and rounds to the nearest byte, so regions
/// that are uniform across the kernel footprint keep their exact value.
/// Pixels beyond the image edge mirror the image without repeating the
/// edge pixel (`dcb|abcd|cba`).
#[must_use = "returns the blurred mask"]
pub fn gaussian_blur_sized(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return mask.clone();
    }

    let (w, h) = mask.dimensions();
    let pad = kernel_size / 2;
    let kernel = gaussian_kernel(kernel_size);

    let padded: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(w + 2 * pad, h + 2 * pad, |x, y| {
            let src_x = reflect_101(i64::from(x) - i64::from(pad), w);
            let src_y = reflect_101(i64::from(y) - i64::from(pad), h);
            Luma([f32::from(mask.get_pixel(src_x, src_y).0[0])])
        });
    let blurred = imageproc::filter::separable_filter_equal(&padded, &kernel);

    GrayImage::from_fn(w, h, |x, y| {
        Luma([to_byte(blurred.get_pixel(x + pad, y + pad).0[0])])
    })
}

/// Map a possibly out-of-range coordinate into `0..len` by mirroring
/// about the first and last pixel. Offsets wider than the image keep
/// bouncing between the two ends.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn reflect_101(i: i64, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let last = i64::from(len) - 1;
    let i = i.rem_euclid(2 * last);
    (if i > last { 2 * last - i } else { i }) as u32
}

/// Apply the smoothing stage to an alpha mask.
///
/// With `smoothing <= 0` (or NaN) the mask is returned untouched.
/// Otherwise the inert cleanup pass runs, followed by a Gaussian blur
/// when the derived kernel is wider than one pixel.
#[must_use = "returns the smoothed mask"]
pub fn smooth_alpha_mask(alpha: GrayImage, smoothing: f64) -> SmoothedMask {
    if smoothing.is_nan() || smoothing <= 0.0 {
        return SmoothedMask {
            mask: alpha,
            cleanup_kernel: None,
            blur_kernel: None,
        };
    }

    let cleanup_kernel = cleanup_kernel_size(smoothing);
    let cleaned = morphological_cleanup(alpha, cleanup_kernel);

    let kernel = blur_kernel_size(smoothing);
    if kernel > 1 {
        SmoothedMask {
            mask: gaussian_blur_sized(&cleaned, kernel),
            cleanup_kernel: Some(cleanup_kernel),
            blur_kernel: Some(kernel),
        }
    } else {
        SmoothedMask {
            mask: cleaned,
            cleanup_kernel: Some(cleanup_kernel),
            blur_kernel: None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
