//! End-to-end watermarking tests.

mod common;

use std::{path::Path, sync::Arc};

use image::{Rgba, RgbaImage};
use vidmark::{
    Logo, LogoScale, Placement, Position, ProgressCallback, ProgressInfo, VideoSource,
    WatermarkError, WatermarkOptions, Watermarker,
};

use common::{
    BACKGROUND, FRAMES, HEIGHT, WIDTH, close_to, fixture_encoder_options, write_empty_fixture,
    write_fixture, write_red_logo,
};

fn top_left_red_square() -> WatermarkOptions {
    WatermarkOptions::new()
        .with_scale(LogoScale::Exact {
            width: 16,
            height: 16,
        })
        .with_placement(Placement::new(Position::TopLeft, 0))
        .with_encoder(fixture_encoder_options())
}

#[test]
fn every_frame_gets_the_logo() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 32, 32);
    let output = directory.path().join("out.mp4");

    let report = Watermarker::new(top_left_red_square())
        .run(&input, &logo, &output)
        .expect("watermark");

    assert_eq!(report.frames_written, FRAMES);
    assert_eq!((report.width, report.height), (WIDTH, HEIGHT));
    assert_eq!(report.output, output);

    let mut source = VideoSource::open(&output).expect("open output");
    assert_eq!(source.metadata().width, WIDTH);
    assert_eq!(source.metadata().height, HEIGHT);

    let mut decoded = 0;
    for frame in source.frames().expect("frame iterator") {
        let (_, image) = frame.expect("decode");
        assert!(
            close_to(image.get_pixel(8, 8), [255, 0, 0], 40),
            "logo pixel was {:?}",
            image.get_pixel(8, 8)
        );
        assert!(
            close_to(image.get_pixel(48, 32), BACKGROUND.0, 16),
            "background pixel was {:?}",
            image.get_pixel(48, 32)
        );
        decoded += 1;
    }
    assert_eq!(decoded, FRAMES);
}

#[test]
fn transparent_logo_leaves_video_unchanged() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = Logo::from_image(RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 0])));
    let output = directory.path().join("clear.mp4");

    Watermarker::new(top_left_red_square())
        .run_with_logo(&input, &logo, &output)
        .expect("watermark");

    let mut source = VideoSource::open(&output).expect("open output");
    let frame = source.first_frame().expect("first frame");
    assert!(close_to(frame.get_pixel(8, 8), BACKGROUND.0, 16));
}

#[test]
fn logo_outside_frame_still_writes_every_frame() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 8, 8);
    let output = directory.path().join("offscreen.mp4");

    let options = top_left_red_square()
        .with_placement(Placement::new(Position::At { x: 1000, y: 1000 }, 0));
    let report = Watermarker::new(options)
        .run(&input, &logo, &output)
        .expect("watermark");

    assert_eq!(report.frames_written, FRAMES);
}

#[test]
fn spawned_job_completes() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 32, 32);
    let output = directory.path().join("spawned.mp4");

    let job = Watermarker::new(top_left_red_square())
        .spawn(&input, &logo, &output)
        .expect("spawn");
    let report = job.join().expect("join");

    assert_eq!(report.frames_written, FRAMES);
    assert!(Path::new(&output).exists());
}

#[test]
fn preview_applies_logo_and_scales() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 32, 32);
    let watermarker = Watermarker::new(top_left_red_square());

    let full = watermarker.preview(&input, &logo, None).expect("preview");
    assert_eq!(full.dimensions(), (WIDTH, HEIGHT));
    assert!(close_to(full.get_pixel(8, 8), [255, 0, 0], 40));

    let scaled = watermarker.preview(&input, &logo, Some(24)).expect("scaled preview");
    assert_eq!(scaled.dimensions(), (32, 24));
}

#[test]
fn empty_input_still_produces_output() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_empty_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 8, 8);
    let output = directory.path().join("empty_out.mp4");

    let report = Watermarker::new(top_left_red_square())
        .run(&input, &logo, &output)
        .expect("watermark empty input");

    assert_eq!(report.frames_written, 0);
    assert!(output.exists());
}

struct PanickingProgress;

impl ProgressCallback for PanickingProgress {
    fn on_progress(&self, _info: &ProgressInfo) {
        panic!("progress sink failed");
    }
}

#[test]
fn panicking_worker_is_reported() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 8, 8);
    let output = directory.path().join("panicked.mp4");

    let options = top_left_red_square().with_progress(Arc::new(PanickingProgress));
    let job = Watermarker::new(options)
        .spawn(&input, &logo, &output)
        .expect("spawn");

    match job.join() {
        Err(WatermarkError::WorkerPanicked(message)) => {
            assert_eq!(message, "progress sink failed");
        }
        other => panic!("Expected WorkerPanicked, got: {other:?}"),
    }
}
