//! Shared fixture helpers.
//!
//! Fixtures are synthesised with `VideoEncoder` into a temporary directory,
//! so the tests need no checked-in media. When the MPEG-4 encoder is not
//! available in the linked FFmpeg build, `write_fixture` returns `None` and
//! callers skip.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ffmpeg_next::Rational;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use vidmark::{EncoderOptions, VideoEncoder, WatermarkError};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;
pub const FRAMES: u64 = 10;
pub const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);

pub fn fixture_encoder_options() -> EncoderOptions {
    EncoderOptions::default().bitrate(2_000_000)
}

/// Write a 10-frame, 64x48, 10 fps flat-grey MP4 into `dir`.
pub fn write_fixture(dir: &Path) -> Option<PathBuf> {
    let path = dir.join("fixture.mp4");
    let mut encoder = match VideoEncoder::create(
        &path,
        WIDTH,
        HEIGHT,
        Rational::new(10, 1),
        &fixture_encoder_options(),
    ) {
        Ok(encoder) => encoder,
        Err(WatermarkError::VideoEncodeError(message)) => {
            eprintln!("Skipping: MPEG-4 encoder not available ({message})");
            return None;
        }
        Err(other) => panic!("failed to create fixture encoder: {other}"),
    };

    let frame = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    for _ in 0..FRAMES {
        encoder.write_frame(&frame).expect("write fixture frame");
    }
    let written = encoder.finish().expect("finish fixture");
    assert_eq!(written, FRAMES);
    Some(path)
}

/// Write a 64x48 MP4 that contains a video stream but no frames.
pub fn write_empty_fixture(dir: &Path) -> Option<PathBuf> {
    let path = dir.join("empty.mp4");
    let encoder = match VideoEncoder::create(
        &path,
        WIDTH,
        HEIGHT,
        Rational::new(10, 1),
        &fixture_encoder_options(),
    ) {
        Ok(encoder) => encoder,
        Err(WatermarkError::VideoEncodeError(message)) => {
            eprintln!("Skipping: MPEG-4 encoder not available ({message})");
            return None;
        }
        Err(other) => panic!("failed to create fixture encoder: {other}"),
    };
    assert_eq!(encoder.finish().expect("finish empty fixture"), 0);
    Some(path)
}

/// Write a solid, fully opaque red PNG logo into `dir`.
pub fn write_red_logo(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("logo.png");
    RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]))
        .save(&path)
        .expect("write logo");
    path
}

/// Loose colour comparison for lossy round trips.
pub fn close_to(actual: &Rgb<u8>, expected: [u8; 3], tolerance: u8) -> bool {
    actual
        .0
        .iter()
        .zip(expected)
        .all(|(&a, e)| a.abs_diff(e) <= tolerance)
}
