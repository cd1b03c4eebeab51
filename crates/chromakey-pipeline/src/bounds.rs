//! Tolerance boxes around the key color.
//!
//! A sensitivity value widens a box in HSV space around the target color.
//! Hue is circular on `0..=179`, so a box that runs off either end of the
//! hue axis gets a second, wrapped box on the opposite end. Matching is a
//! single predicate, [`ToleranceBounds::contains`], over one or two boxes.
//!
//! Sensitivity is nominally `0..=100`. At 100 the hue half-width is 60,
//! well short of the 90 needed for a box to overflow both ends at once, so
//! a single wrap box suffices. Larger sensitivities are accepted but not
//! given a second wrap box; only the lower end wraps in that case.

use serde::{Deserialize, Serialize};

use crate::types::Hsv;

/// Upper limit of the hue axis.
const HUE_MAX: i32 = Hsv::MAX_HUE as i32;

/// Upper limit of the saturation and value axes.
const CHANNEL_MAX: i32 = u8::MAX as i32;

/// Number of hue steps in a full circle.
const HUE_STEPS: i32 = HUE_MAX + 1;

/// Per-channel half-widths derived from a sensitivity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTolerance {
    /// Hue half-width.
    pub hue: i32,
    /// Saturation half-width.
    pub saturation: i32,
    /// Value half-width.
    pub value: i32,
}

impl ChannelTolerance {
    /// Derive half-widths from a sensitivity.
    ///
    /// The sensitivity is truncated to an integer first, then scaled:
    /// hue by 0.6, saturation by 1.5 plus 20, value by 1.5 plus 40. Each
    /// product is truncated toward zero. The saturation and value offsets
    /// keep a baseline tolerance even at sensitivity 0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_sensitivity(sensitivity: f64) -> Self {
        let t = sensitivity.trunc();
        Self {
            hue: (t * 0.6) as i32,
            saturation: ((t * 1.5) as i32).saturating_add(20),
            value: ((t * 1.5) as i32).saturating_add(40),
        }
    }
}

/// An inclusive box in HSV space.
///
/// Components are `i32` because a negative sensitivity can leave `lower`
/// above `upper` (an empty box) and push a lower bound past the channel
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBox {
    /// Inclusive lower corner `[hue, saturation, value]`.
    pub lower: [i32; 3],
    /// Inclusive upper corner `[hue, saturation, value]`.
    pub upper: [i32; 3],
}

impl HsvBox {
    /// Returns `true` if every component of `hsv` lies within the box.
    #[must_use]
    pub fn contains(&self, hsv: Hsv) -> bool {
        let components = [hsv.hue, hsv.saturation, hsv.value];
        components
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(&c, (&lo, &hi))| (lo..=hi).contains(&i32::from(c)))
    }

    /// Returns `true` if no color can fall inside the box.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower.iter().zip(&self.upper).any(|(lo, hi)| lo > hi)
    }
}

/// The primary tolerance box plus an optional hue-wrapped companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceBounds {
    /// Box centered on the target, clamped to the channel limits.
    pub primary: HsvBox,
    /// Box on the opposite end of the hue axis, present when the primary
    /// hue interval overflowed `0` or `179`.
    pub wrap: Option<HsvBox>,
}

impl ToleranceBounds {
    /// Derive the tolerance boxes for `target` at `sensitivity`.
    #[must_use]
    pub fn new(target: Hsv, sensitivity: f64) -> Self {
        Self::from_tolerance(target, ChannelTolerance::from_sensitivity(sensitivity))
    }

    /// Derive the tolerance boxes for `target` from explicit half-widths.
    #[must_use]
    pub fn from_tolerance(target: Hsv, tol: ChannelTolerance) -> Self {
        let h = i32::from(target.hue);
        let s = i32::from(target.saturation);
        let v = i32::from(target.value);

        let hue_low = h.saturating_sub(tol.hue);
        let hue_high = h.saturating_add(tol.hue);

        let sat_range = (
            0.max(s.saturating_sub(tol.saturation)),
            CHANNEL_MAX.min(s.saturating_add(tol.saturation)),
        );
        let val_range = (
            0.max(v.saturating_sub(tol.value)),
            CHANNEL_MAX.min(v.saturating_add(tol.value)),
        );

        let make_box = |hue_lo: i32, hue_hi: i32| HsvBox {
            lower: [hue_lo, sat_range.0, val_range.0],
            upper: [hue_hi, sat_range.1, val_range.1],
        };

        let primary = make_box(0.max(hue_low), HUE_MAX.min(hue_high));

        let wrap = if hue_low < 0 {
            Some(make_box(0.max(HUE_STEPS + hue_low), HUE_MAX))
        } else if hue_high > HUE_MAX {
            Some(make_box(0, HUE_MAX.min(hue_high - HUE_MAX)))
        } else {
            None
        };

        Self { primary, wrap }
    }

    /// Returns `true` if `hsv` lies in the primary box or the wrap box.
    #[must_use]
    pub fn contains(&self, hsv: Hsv) -> bool {
        self.primary.contains(hsv) || self.wrap.is_some_and(|w| w.contains(hsv))
    }
}
