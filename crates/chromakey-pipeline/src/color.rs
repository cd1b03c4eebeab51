//! Hex color parsing and RGB-to-HSV conversion.
//!
//! Hue is reported on the half-circle scale `0..=179` (degrees / 2), with
//! saturation and value on `0..=255`. The conversion uses 8-bit fixed
//! point with 12 fractional bits and rounds half up, the same arithmetic
//! widely used by 8-bit vision libraries. Tolerance arithmetic in
//! [`crate::bounds`] depends on this exact scale, and the target color and
//! every image pixel go through the same [`rgb_to_hsv`], so identical RGB
//! always yields identical HSV.

use crate::types::{ColorError, Hsv, KeyError};

/// Fractional bits of the fixed-point divisors.
const HSV_SHIFT: u32 = 12;

/// Half of one fixed-point unit, added before shifting to round.
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// Number of hue steps in a full circle on the half-circle scale.
const HUE_STEPS: i32 = 180;

/// Parse a 6-digit hex color into `[r, g, b]`.
///
/// A single leading `#` is accepted. Any other prefix, suffix, or
/// whitespace is rejected.
///
/// # Errors
///
/// Returns [`ColorError::InvalidDigit`] for the first non-hex character
/// and [`ColorError::WrongLength`] when there are not exactly six digits.
pub fn parse_hex(input: &str) -> Result<[u8; 3], ColorError> {
    let digits = input.strip_prefix('#').unwrap_or(input);

    let nibbles = digits
        .chars()
        .map(|c| {
            c.to_digit(16)
                .and_then(|d| u8::try_from(d).ok())
                .ok_or(ColorError::InvalidDigit(c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let [r1, r0, g1, g0, b1, b0] = nibbles[..] else {
        return Err(ColorError::WrongLength(nibbles.len()));
    };

    Ok([(r1 << 4) | r0, (g1 << 4) | g0, (b1 << 4) | b0])
}

/// Parse a hex color and convert it to HSV.
///
/// # Errors
///
/// Returns [`KeyError::InvalidColor`] if `input` is not a valid 6-digit
/// hex color.
pub fn hex_to_hsv(input: &str) -> Result<Hsv, KeyError> {
    let [r, g, b] = parse_hex(input).map_err(|source| KeyError::InvalidColor {
        input: input.to_owned(),
        source,
    })?;
    Ok(rgb_to_hsv(r, g, b))
}

/// Convert an 8-bit RGB color to HSV on the half-circle hue scale.
///
/// Achromatic colors (all channels equal) have hue 0 and saturation 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));

    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s = (diff * saturation_divisor(v) + HSV_ROUND) >> HSV_SHIFT;

    // Red wins ties with green, green wins ties with blue.
    let sector = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (sector * hue_divisor(diff) + HSV_ROUND) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_STEPS;
    }

    // h is in 0..180, s and v in 0..=255 by construction.
    Hsv::new(h as u8, s as u8, v as u8)
}

/// Fixed-point reciprocal `round(255 / v)` used for saturation.
const fn saturation_divisor(v: i32) -> i32 {
    if v == 0 {
        0
    } else {
        rounded_div(255 << HSV_SHIFT, v)
    }
}

/// Fixed-point reciprocal `round(180 / (6 * diff))` used for hue.
const fn hue_divisor(diff: i32) -> i32 {
    if diff == 0 {
        0
    } else {
        rounded_div(HUE_STEPS << HSV_SHIFT, 6 * diff)
    }
}

/// `round(num / den)` for positive operands, halves rounded up.
const fn rounded_div(num: i32, den: i32) -> i32 {
    (2 * num + den) / (2 * den)
}
