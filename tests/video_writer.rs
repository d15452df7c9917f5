//! Encoder and source integration tests.
//!
//! Fixtures are generated on the fly; see `tests/common/mod.rs`.

mod common;

use ffmpeg_next::{Rational, codec::Id};
use image::RgbImage;
use vidmark::{EncoderOptions, VideoEncoder, VideoSource, WatermarkError};

use common::{
    BACKGROUND, FRAMES, HEIGHT, WIDTH, close_to, fixture_encoder_options, write_fixture,
};

#[test]
fn written_video_reads_back_with_same_properties() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(path) = write_fixture(directory.path()) else {
        return;
    };

    let source = VideoSource::open(&path).expect("open fixture");
    let metadata = source.metadata();
    assert_eq!(metadata.width, WIDTH);
    assert_eq!(metadata.height, HEIGHT);
    assert!(
        (metadata.frames_per_second - 10.0).abs() < 0.01,
        "unexpected fps {}",
        metadata.frames_per_second
    );
    assert_eq!(metadata.frame_count, FRAMES);
}

#[test]
fn frames_decode_in_order() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(path) = write_fixture(directory.path()) else {
        return;
    };

    let mut source = VideoSource::open(&path).expect("open fixture");
    let indices: Vec<u64> = source
        .frames()
        .expect("frame iterator")
        .map(|frame| {
            let (index, image) = frame.expect("decode frame");
            assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
            assert!(close_to(image.get_pixel(32, 24), BACKGROUND.0, 12));
            index
        })
        .collect();

    assert_eq!(indices, (0..FRAMES).collect::<Vec<_>>());
}

#[test]
fn first_frame_matches_fixture() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(path) = write_fixture(directory.path()) else {
        return;
    };

    let mut source = VideoSource::open(&path).expect("open fixture");
    let frame = source.first_frame().expect("first frame");
    assert_eq!(frame.dimensions(), (WIDTH, HEIGHT));
}

#[test]
fn mismatched_frame_size_is_rejected() {
    let directory = tempfile::tempdir().expect("temp dir");
    let output = directory.path().join("mismatch.mp4");
    let mut encoder = match VideoEncoder::create(
        &output,
        WIDTH,
        HEIGHT,
        Rational::new(10, 1),
        &fixture_encoder_options(),
    ) {
        Ok(encoder) => encoder,
        Err(WatermarkError::VideoEncodeError(_)) => return,
        Err(other) => panic!("unexpected error: {other}"),
    };

    let result = encoder.write_frame(&RgbImage::new(WIDTH / 2, HEIGHT));
    assert!(matches!(result, Err(WatermarkError::VideoWriteError(_))));
    assert_eq!(encoder.frames_written(), 0);
    encoder.finish().expect("finish empty output");
}

#[test]
fn variable_frame_rate_source_rate_is_accepted_by_mpeg4() {
    ffmpeg_next::init().expect("init FFmpeg");
    if ffmpeg_next::encoder::find(Id::MPEG4).is_none() {
        eprintln!("Skipping: MPEG-4 encoder not available");
        return;
    }

    let directory = tempfile::tempdir().expect("temp dir");
    let output = directory.path().join("vfr.mp4");
    let mut encoder = VideoEncoder::create(
        &output,
        WIDTH,
        HEIGHT,
        Rational::new(1_800_000, 60_061),
        &EncoderOptions::default(),
    )
    .expect("encoder accepts a 29.97 fps rate with large terms");

    let frame = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    for _ in 0..5 {
        encoder.write_frame(&frame).expect("write frame");
    }
    assert_eq!(encoder.finish().expect("finish"), 5);

    let source = VideoSource::open(&output).expect("open output");
    let fps = source.metadata().frames_per_second;
    assert!((fps - 29.97).abs() < 0.05, "unexpected fps {fps}");
}
