//! Per-stage timing and pixel counts for a keying run.
//!
//! [`process_staged_with_diagnostics`] is the single implementation of
//! the keying pipeline; [`crate::process_staged`] and [`crate::process`]
//! call it with [`NoClock`] and drop the diagnostics.
//!
//! Time is read through the [`Clock`] trait so this crate never touches
//! a platform clock itself. Durations are serialized as fractional
//! seconds (`f64`) for JSON compatibility, since `std::time::Duration`
//! does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bounds::ToleranceBounds;
use crate::types::{Dimensions, Hsv, KeyError, KeyParams, RgbaImage, StagedResult};
use crate::{codec, color, composite, mask, smooth};

/// `Duration` <-> `f64` seconds for serde.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "expected a finite, non-negative number of seconds",
            )
        })
    }
}

/// `f64` parameters for serde. JSON has no NaN or infinity, so those are
/// written as the strings `"NaN"`, `"inf"` and `"-inf"`.
mod param_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            value.serialize(serializer)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(t) => match t.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "expected a number, \"NaN\", \"inf\" or \"-inf\", found {other:?}"
                ))),
            },
        }
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A [`Clock`] that never advances. Every duration is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Everything measured during one call to [`process_staged_with_diagnostics`].
///
/// The smoothing stage is `None` when smoothing was disabled
/// (`smoothing <= 0`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDiagnostics {
    /// Stage 1: key color parsing and tolerance bounds.
    pub target: StageDiagnostics,
    /// Stage 2: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 3: key mask construction and inversion.
    pub key: StageDiagnostics,
    /// Stage 4: alpha mask cleanup and blur.
    pub smooth: Option<StageDiagnostics>,
    /// Stage 5: alpha compositing.
    pub composite: StageDiagnostics,
    /// Stage 6: PNG encoding.
    pub encode: StageDiagnostics,
    /// Time from the first stage starting to the last one finishing.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline counts.
    pub summary: KeySummary,
}

/// Timing and metrics for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Time spent in this stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Key color metrics.
    Target {
        /// Key color as given by the caller.
        color: String,
        /// Key color in HSV space.
        hsv: Hsv,
        /// Sensitivity used to derive `bounds`.
        #[serde(with = "param_serde")]
        sensitivity: f64,
        /// Tolerance boxes.
        bounds: ToleranceBounds,
    },
    /// Decoder output.
    Decode {
        /// Length of the encoded input.
        input_bytes: usize,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Key mask metrics.
    Key {
        /// Pixels that matched the key color.
        matched_pixel_count: u64,
        /// Total pixel count for computing coverage.
        total_pixel_count: u64,
        /// Whether a hue-wrapped box took part in matching.
        wrapped: bool,
    },
    /// Smoothing metrics.
    Smooth {
        /// Smoothing strength.
        #[serde(with = "param_serde")]
        smoothing: f64,
        /// Cleanup kernel size (the cleanup pass itself is inert).
        cleanup_kernel: u32,
        /// Blur kernel size, `None` when the kernel was a single pixel.
        blur_kernel: Option<u32>,
    },
    /// Compositing metrics.
    Composite {
        /// Pixels with final alpha 0.
        transparent_pixel_count: u64,
        /// Pixels with final alpha strictly between 0 and 255.
        partial_pixel_count: u64,
    },
    /// PNG encoding metrics.
    Encode {
        /// Size of the encoded PNG.
        output_bytes: usize,
    },
}

/// Pixel counts for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySummary {
    /// Source width.
    pub image_width: u32,
    /// Source height.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Pixels that matched the key color.
    pub keyed_pixel_count: u64,
    /// Pixels that are fully transparent in the output.
    pub transparent_pixel_count: u64,
}

/// Run the pipeline, keeping intermediate artifacts and stage diagnostics.
///
/// The key color is validated before the image is decoded, so an invalid
/// color is reported even when the image bytes are also bad.
///
/// # Errors
///
/// Returns [`KeyError::InvalidColor`] for a malformed key color,
/// [`KeyError::Decode`] for unreadable image bytes, and
/// [`KeyError::Encode`] if the result cannot be written as PNG.
pub fn process_staged_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    params: &KeyParams,
    clock: &C,
) -> Result<(StagedResult, KeyDiagnostics), KeyError> {
    let pipeline_start = clock.now();

    // 1. Key color and tolerance bounds.
    let start = clock.now();
    let target = color::hex_to_hsv(&params.color)?;
    let bounds = ToleranceBounds::new(target, params.sensitivity);
    let target_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Target {
            color: params.color.clone(),
            hsv: target,
            sensitivity: params.sensitivity,
            bounds,
        },
    };

    // 2. Decode.
    let start = clock.now();
    let original = codec::decode_rgba(image_bytes)?;
    let dimensions = Dimensions {
        width: original.width(),
        height: original.height(),
    };
    let decode_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    };

    // 3. Key mask, inverted into an alpha mask.
    let start = clock.now();
    let keyed = mask::key_mask(&original, &bounds);
    let alpha = mask::invert_mask(&keyed);
    let keyed_pixel_count = mask::matched_pixel_count(&keyed);
    let key_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Key {
            matched_pixel_count: keyed_pixel_count,
            total_pixel_count: dimensions.pixel_count(),
            wrapped: bounds.wrap.is_some(),
        },
    };

    // 4. Optional smoothing.
    let start = clock.now();
    let smoothed = smooth::smooth_alpha_mask(alpha, params.smoothing);
    let smooth_diag = smoothed.cleanup_kernel.map(|cleanup_kernel| StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Smooth {
            smoothing: params.smoothing,
            cleanup_kernel,
            blur_kernel: smoothed.blur_kernel,
        },
    });

    // 5. Composite.
    let start = clock.now();
    let composited = composite::apply_alpha_mask(&original, &smoothed.mask);
    let (transparent, partial) = alpha_coverage(&composited);
    let composite_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Composite {
            transparent_pixel_count: transparent,
            partial_pixel_count: partial,
        },
    };

    // 6. Encode.
    let start = clock.now();
    let png = codec::encode_png(&composited)?;
    let encode_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Encode {
            output_bytes: png.len(),
        },
    };

    let diagnostics = KeyDiagnostics {
        target: target_diag,
        decode: decode_diag,
        key: key_diag,
        smooth: smooth_diag,
        composite: composite_diag,
        encode: encode_diag,
        total_duration: clock.elapsed(&pipeline_start),
        summary: KeySummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            keyed_pixel_count,
            transparent_pixel_count: transparent,
        },
    };

    let staged = StagedResult {
        target,
        bounds,
        original,
        keyed,
        alpha_mask: smoothed.mask,
        blur_kernel: smoothed.blur_kernel,
        composited,
        png,
        dimensions,
    };

    Ok((staged, diagnostics))
}

impl KeyDiagnostics {
    /// Render a plain-text table of stage timings and metrics.
    #[must_use]
    pub fn report(&self) -> String {
        let total = millis(self.total_duration);

        let mut lines = vec![
            "Keying Diagnostics Report".to_owned(),
            "=".repeat(60),
            format!(
                "Image: {}x{} ({} pixels)",
                self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
            ),
            format!("Elapsed: {total:.3}ms"),
            String::new(),
            format!("{:<12} {:>10} {:>7}  Details", "Stage", "Time", "Share"),
            "-".repeat(80),
        ];

        lines.extend(self.stages().map(|(name, stage)| {
            let ms = millis(stage.duration);
            let share = if total > 0.0 { ms / total * 100.0 } else { 0.0 };
            format!("{name:<12} {ms:>8.3}ms {share:>6.1}%  {}", describe(&stage.metrics))
        }));

        lines.push(String::new());
        lines.push(format!(
            "Keyed: {}  |  Transparent: {}",
            self.summary.keyed_pixel_count, self.summary.transparent_pixel_count,
        ));

        lines.join("\n")
    }

    /// Stages that ran, in pipeline order.
    fn stages(&self) -> impl Iterator<Item = (&'static str, &StageDiagnostics)> {
        [
            Some(("Target", &self.target)),
            Some(("Decode", &self.decode)),
            Some(("Key", &self.key)),
            self.smooth.as_ref().map(|s| ("Smooth", s)),
            Some(("Composite", &self.composite)),
            Some(("Encode", &self.encode)),
        ]
        .into_iter()
        .flatten()
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// One-line summary of a stage's metrics.
fn describe(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Target {
            color,
            hsv,
            sensitivity,
            bounds,
        } => {
            let wrap = bounds
                .wrap
                .map(|w| format!(" wrap={:?}..={:?}", w.lower, w.upper))
                .unwrap_or_default();
            format!(
                "{color} -> hsv({}, {}, {}) t={sensitivity} box={:?}..={:?}{wrap}",
                hsv.hue, hsv.saturation, hsv.value, bounds.primary.lower, bounds.primary.upper,
            )
        }
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Key {
            matched_pixel_count,
            total_pixel_count,
            wrapped,
        } => {
            let coverage = percent(*matched_pixel_count, *total_pixel_count);
            let wrap = if *wrapped { " (hue wrapped)" } else { "" };
            format!("matched={matched_pixel_count} ({coverage:.1}%){wrap}")
        }
        StageMetrics::Smooth {
            smoothing,
            cleanup_kernel,
            blur_kernel,
        } => match blur_kernel {
            Some(k) => format!("smoothing={smoothing} cleanup={cleanup_kernel} (inert) blur={k}x{k}"),
            None => format!("smoothing={smoothing} cleanup={cleanup_kernel} (inert) blur=off"),
        },
        StageMetrics::Composite {
            transparent_pixel_count,
            partial_pixel_count,
        } => format!("transparent={transparent_pixel_count} partial={partial_pixel_count}"),
        StageMetrics::Encode { output_bytes } => format!("{output_bytes} bytes PNG"),
    }
}

/// Count fully transparent and partially transparent pixels.
pub(crate) fn alpha_coverage(image: &RgbaImage) -> (u64, u64) {
    image
        .pixels()
        .fold((0, 0), |(transparent, partial), p| match p.0[3] {
            0 => (transparent + 1, partial),
            255 => (transparent, partial),
            _ => (transparent, partial + 1),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond on every reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get() + 1;
            self.0.set(t);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn green_with_red_square_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            if (4..12).contains(&x) && (4..12).contains(&y) {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 255, 0, 255])
            }
        });
        codec::encode_png(&img).unwrap()
    }

    #[test]
    fn millis_of_duration() {
        assert!((millis(Duration::from_micros(2500)) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn alpha_coverage_counts() {
        let img = RgbaImage::from_fn(4, 1, |x, _| image::Rgba([0, 0, 0, [0, 0, 128, 255][x as usize]]));
        assert_eq!(alpha_coverage(&img), (2, 1));
    }

    #[test]
    fn no_clock_reports_zero_durations() {
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &KeyParams::default(), &NoClock)
                .unwrap();
        assert_eq!(diag.total_duration, Duration::ZERO);
        assert_eq!(diag.decode.duration, Duration::ZERO);
    }

    #[test]
    fn tick_clock_durations_are_positive() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &KeyParams::default(), &clock)
                .unwrap();
        assert!(diag.decode.duration > Duration::ZERO);
        assert!(diag.total_duration > diag.decode.duration);
    }

    #[test]
    fn summary_counts_match_image() {
        let (staged, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &KeyParams::default(), &NoClock)
                .unwrap();
        assert_eq!(diag.summary.pixel_count, 256);
        assert_eq!(diag.summary.keyed_pixel_count, 256 - 64);
        assert_eq!(diag.summary.transparent_pixel_count, 256 - 64);
        assert!(diag.smooth.is_none());
        assert_eq!(staged.dimensions.width, 16);
    }

    #[test]
    fn smoothing_stage_recorded_when_enabled() {
        let params = KeyParams {
            smoothing: 25.0,
            ..KeyParams::default()
        };
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &params, &NoClock).unwrap();
        let smooth = diag.smooth.unwrap();
        assert!(matches!(
            smooth.metrics,
            StageMetrics::Smooth {
                cleanup_kernel: 2,
                blur_kernel: Some(11),
                ..
            }
        ));
    }

    #[test]
    fn invalid_color_checked_before_decode() {
        let params = KeyParams {
            color: "#GG0000".to_owned(),
            ..KeyParams::default()
        };
        let result = process_staged_with_diagnostics(&[0, 1, 2], &params, &NoClock);
        assert!(matches!(result, Err(KeyError::InvalidColor { .. })));
    }

    #[test]
    fn report_lists_stages() {
        let params = KeyParams {
            smoothing: 10.0,
            ..KeyParams::default()
        };
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &params, &NoClock).unwrap();
        let report = diag.report();
        assert!(report.contains("Keying Diagnostics Report"));
        assert!(report.contains("Image: 16x16 (256 pixels)"));
        assert!(report.contains("#00FF00 -> hsv(60, 255, 255)"));
        assert!(report.contains("blur=5x5"));
        assert!(report.contains("Encode"));
        // Six stage rows between the rule and the blank line, summary last.
        let rule = report.lines().position(|l| l == "-".repeat(80)).unwrap();
        assert_eq!(report.lines().nth(rule + 7), Some(""));
        assert!(report.lines().last().unwrap().starts_with("Keyed: 192  |  Transparent: "));
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &KeyParams::default(), &NoClock)
                .unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: KeyDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.keyed_pixel_count, diag.summary.keyed_pixel_count);
        assert!(matches!(back.target.metrics, StageMetrics::Target { .. }));
    }

    #[test]
    fn non_finite_sensitivity_survives_json() {
        for sensitivity in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let params = KeyParams {
                sensitivity,
                ..KeyParams::default()
            };
            let (_, diag) =
                process_staged_with_diagnostics(&green_with_red_square_png(), &params, &NoClock)
                    .unwrap();
            let json = serde_json::to_string(&diag).unwrap();
            let back: KeyDiagnostics = serde_json::from_str(&json).unwrap();
            let restored = match back.target.metrics {
                StageMetrics::Target { sensitivity, .. } => Some(sensitivity),
                _ => None,
            }
            .unwrap();
            assert_eq!(restored.to_bits(), sensitivity.to_bits(), "sensitivity {sensitivity}");
        }
    }

    #[test]
    fn unknown_parameter_text_is_rejected() {
        let (_, diag) =
            process_staged_with_diagnostics(&green_with_red_square_png(), &KeyParams::default(), &NoClock)
                .unwrap();
        let json = serde_json::to_string(&diag)
            .unwrap()
            .replace("\"sensitivity\":50.0", "\"sensitivity\":\"lots\"");
        assert!(json.contains("\"lots\""));
        assert!(serde_json::from_str::<KeyDiagnostics>(&json).is_err());
    }
}
