//! Image decoding and PNG encoding.
//!
//! Decoding accepts raw image bytes (PNG, JPEG, BMP, WebP) and always
//! yields 8-bit RGBA. Sources without an alpha channel get alpha 255;
//! grayscale and 16-bit sources are converted. Encoding is lossless PNG,
//! so encoded pixels decode back unchanged.

use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};

use crate::types::{GrayImage, KeyError, RgbaImage};

/// Decode raw image bytes into an RGBA image.
///
/// # Errors
///
/// Returns [`KeyError::Decode`] if `bytes` is empty, the format is
/// unrecognized, or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, KeyError> {
    let img = image::load_from_memory(bytes).map_err(KeyError::Decode)?;
    Ok(img.into_rgba8())
}

/// Encode an RGBA image as PNG.
///
/// # Errors
///
/// Returns [`KeyError::Encode`] if the PNG encoder rejects the image.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, KeyError> {
    encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
}

/// Encode a single-channel mask as a grayscale PNG.
///
/// # Errors
///
/// Returns [`KeyError::Encode`] if the PNG encoder rejects the image.
pub fn encode_gray_png(mask: &GrayImage) -> Result<Vec<u8>, KeyError> {
    encode(mask.as_raw(), mask.width(), mask.height(), ExtendedColorType::L8)
}

fn encode(
    raw: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<Vec<u8>, KeyError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(raw, width, height, color)
        .map_err(KeyError::Encode)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_decode_error() {
        let result = decode_rgba(&[]);
        assert!(matches!(result, Err(KeyError::Decode(_))));
    }

    #[test]
    fn corrupt_bytes_returns_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(KeyError::Decode(_))));
    }

    #[test]
    fn rgb_source_gains_opaque_alpha() {
        let img = image::RgbImage::from_fn(3, 2, |x, y| {
            image::Rgb([u8::try_from(x * 40).unwrap(), u8::try_from(y * 90).unwrap(), 7])
        });
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
            .unwrap();

        let rgba = decode_rgba(&buf).unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        for (x, y, p) in rgba.enumerate_pixels() {
            let src = img.get_pixel(x, y);
            assert_eq!(p.0, [src.0[0], src.0[1], src.0[2], 255]);
        }
    }

    #[test]
    fn grayscale_source_expands_to_rgba() {
        let img = GrayImage::from_pixel(2, 2, image::Luma([77]));
        let buf = encode_gray_png(&img).unwrap();
        let rgba = decode_rgba(&buf).unwrap();
        for p in rgba.pixels() {
            assert_eq!(p.0, [77, 77, 77, 255]);
        }
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = RgbaImage::from_fn(17, 31, |x, y| {
            image::Rgba([
                u8::try_from((x * 15) % 256).unwrap(),
                u8::try_from((y * 8) % 256).unwrap(),
                u8::try_from((x + y) % 256).unwrap(),
                u8::try_from((x * y) % 256).unwrap(),
            ])
        });
        let png = encode_png(&img).unwrap();
        let decoded = decode_rgba(&png).unwrap();
        assert_eq!(decoded.dimensions(), img.dimensions());
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn encoded_bytes_carry_png_signature() {
        let png = encode_png(&RgbaImage::new(1, 1)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
