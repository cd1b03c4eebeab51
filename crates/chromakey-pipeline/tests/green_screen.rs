//! Integration test: key synthetic green-screen and red-screen images
//! end to end through the public API and inspect the decoded PNG output.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chromakey_pipeline::{KeyError, KeyParams, RgbaImage, codec, process, process_staged};
use image::Rgba;

fn encode(img: &RgbaImage) -> Vec<u8> {
    codec::encode_png(img).expect("encoding a test image should succeed")
}

fn key(img: &RgbaImage, color: &str, sensitivity: f64, smoothing: f64) -> RgbaImage {
    let png = process(&encode(img), color, sensitivity, smoothing).expect("keying should succeed");
    codec::decode_rgba(&png).expect("output should be a readable PNG")
}

fn transparent_count(img: &RgbaImage) -> usize {
    img.pixels().filter(|p| p.0[3] == 0).count()
}

/// Horizontal ramp from pure green toward cyan-ish greens, then a
/// foreground band of magenta (hue 150, outside every green tolerance).
fn green_ramp() -> RgbaImage {
    RgbaImage::from_fn(64, 8, |x, _| {
        if x >= 56 {
            Rgba([255, 0, 255, 255])
        } else {
            let drift = u8::try_from(x * 4).unwrap();
            Rgba([0, 255 - drift / 2, drift, 255])
        }
    })
}

#[test]
fn already_transparent_pixels_stay_transparent() {
    // Red subject with a transparent hole in it, on green.
    let img = RgbaImage::from_fn(30, 30, |x, y| {
        let in_subject = (10..20).contains(&x) && (10..20).contains(&y);
        let in_hole = (13..17).contains(&x) && (13..17).contains(&y);
        match (in_subject, in_hole) {
            (true, true) => Rgba([255, 0, 0, 0]),
            (true, false) => Rgba([255, 0, 0, 255]),
            _ => Rgba([0, 255, 0, 255]),
        }
    });

    let once = key(&img, "#00FF00", 50.0, 0.0);
    assert_eq!(once.get_pixel(15, 15).0[3], 0, "hole must stay transparent");
    assert_eq!(once.get_pixel(11, 11).0[3], 255);
    assert_eq!(once.get_pixel(0, 0).0[3], 0);

    // Keying the result again changes nothing: every alpha-0 pixel stays 0.
    let twice = key(&once, "#00FF00", 50.0, 0.0);
    assert_eq!(twice.as_raw(), once.as_raw());
}

#[test]
fn output_round_trips_through_png() {
    let img = green_ramp();
    let png = process(&encode(&img), "#00FF00", 40.0, 12.0).unwrap();
    let decoded = codec::decode_rgba(&png).unwrap();
    let reencoded = codec::encode_png(&decoded).unwrap();
    assert_eq!(codec::decode_rgba(&reencoded).unwrap().as_raw(), decoded.as_raw());
}

#[test]
fn rgb_channels_survive_keying() {
    let img = green_ramp();
    let out = key(&img, "#00FF00", 100.0, 30.0);
    for (x, y, p) in out.enumerate_pixels() {
        assert_eq!(&p.0[..3], &img.get_pixel(x, y).0[..3], "rgb changed at ({x},{y})");
    }
}

#[test]
fn wider_sensitivity_keys_more_pixels() {
    let img = green_ramp();
    let narrow = transparent_count(&key(&img, "#00FF00", 0.0, 0.0));
    let medium = transparent_count(&key(&img, "#00FF00", 50.0, 0.0));
    let wide = transparent_count(&key(&img, "#00FF00", 100.0, 0.0));
    assert!(narrow >= 8, "exact key color column should be keyed");
    assert!(narrow <= medium && medium <= wide, "{narrow} <= {medium} <= {wide}");
    assert!(narrow < wide);
    // The magenta band is never keyed, even at full sensitivity.
    assert!(wide <= 56 * 8);
}

#[test]
fn red_key_wraps_across_hue_zero() {
    // Left: orange-red (hue just above 0). Right: crimson (hue just below 180).
    // Middle: green foreground.
    let img = RgbaImage::from_fn(30, 4, |x, _| match x {
        0..10 => Rgba([255, 40, 0, 255]),
        10..20 => Rgba([0, 200, 0, 255]),
        _ => Rgba([255, 0, 40, 255]),
    });
    let out = key(&img, "#FF0000", 30.0, 0.0);
    assert_eq!(out.get_pixel(2, 1).0[3], 0, "orange-red should be keyed");
    assert_eq!(out.get_pixel(25, 1).0[3], 0, "crimson should be keyed via wrap box");
    assert_eq!(out.get_pixel(15, 1).0[3], 255, "green subject should be kept");
}

#[test]
fn smoothing_softens_the_matte_edge() {
    let img = RgbaImage::from_fn(40, 40, |x, _| {
        if x < 20 {
            Rgba([0, 255, 0, 255])
        } else {
            Rgba([200, 30, 30, 255])
        }
    });

    let hard = key(&img, "#00FF00", 50.0, 0.0);
    assert!(hard.pixels().all(|p| p.0[3] == 0 || p.0[3] == 255));

    let soft = key(&img, "#00FF00", 50.0, 30.0);
    let partial = soft.pixels().filter(|p| p.0[3] != 0 && p.0[3] != 255).count();
    assert!(partial > 0, "expected a soft ramp at the edge");
    assert_eq!(soft.get_pixel(0, 20).0[3], 0);
    assert_eq!(soft.get_pixel(39, 20).0[3], 255);
}

#[test]
fn blur_mirrors_at_the_image_border() {
    // Red subject in column 0 only. A 3-tap blur mirrors x=-1 onto the
    // green column x=1, so the edge pixel lands halfway.
    let img = RgbaImage::from_fn(8, 8, |x, _| {
        if x == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 255, 0, 255])
        }
    });
    let out = key(&img, "#00FF00", 50.0, 5.0);
    for y in 0..8 {
        assert_eq!(out.get_pixel(0, y).0[3], 128, "row {y}");
        assert_eq!(out.get_pixel(1, y).0[3], 64, "row {y}");
        assert_eq!(out.get_pixel(2, y).0[3], 0, "row {y}");
    }
}

#[test]
fn jpeg_input_gains_alpha() {
    let rgb = image::RgbImage::from_pixel(16, 16, image::Rgb([0, 255, 0]));
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
        .encode_image(&rgb)
        .unwrap();

    let png = process(&jpeg, "#00FF00", 50.0, 0.0).unwrap();
    let out = codec::decode_rgba(&png).unwrap();
    assert_eq!(out.dimensions(), (16, 16));
    assert!(out.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn staged_result_matches_process_output() {
    let img = green_ramp();
    let params = KeyParams {
        smoothing: 20.0,
        ..KeyParams::default()
    };
    let staged = process_staged(&encode(&img), &params).unwrap();
    let direct = process(&encode(&img), &params.color, params.sensitivity, params.smoothing).unwrap();
    assert_eq!(staged.png, direct);
    assert_eq!(staged.blur_kernel, Some(9));
    assert_eq!(staged.original.as_raw(), img.as_raw());
}

#[test]
fn errors_are_distinct() {
    let png = encode(&green_ramp());
    assert!(matches!(
        process(&png, "#ZZZZZZ", 50.0, 0.0),
        Err(KeyError::InvalidColor { .. })
    ));
    assert!(matches!(
        process(b"not an image", "#00FF00", 50.0, 0.0),
        Err(KeyError::Decode(_))
    ));
}
