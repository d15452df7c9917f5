//! Progress and cancellation integration tests.

mod common;

use std::sync::{Arc, Mutex};

use vidmark::{
    CancellationToken, ProgressCallback, ProgressInfo, VideoSource, WatermarkError,
    WatermarkOptions, Watermarker,
};

use common::{FRAMES, fixture_encoder_options, write_fixture, write_red_logo};

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn progress_reaches_one_hundred_percent() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 16, 16);
    let output = directory.path().join("out.mp4");

    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });
    let options = WatermarkOptions::new()
        .with_encoder(fixture_encoder_options())
        .with_progress(recorder.clone())
        .with_batch_size(1);
    Watermarker::new(options)
        .run(&input, &logo, &output)
        .expect("watermark");

    let infos = recorder.infos.lock().unwrap();
    // One report per frame plus the final one.
    assert_eq!(infos.len() as u64, FRAMES + 1);

    for window in infos.windows(2) {
        assert!(window[1].current >= window[0].current);
        assert!(window[1].percent >= window[0].percent);
    }

    let first = &infos[0];
    assert_eq!(first.current, 1);
    assert_eq!(first.total, Some(FRAMES));
    assert_eq!(first.percent, Some(10));

    let last = infos.last().unwrap();
    assert!(last.finished);
    assert_eq!(last.current, FRAMES);
    assert_eq!(last.percent, Some(100));
}

#[test]
fn batch_size_thins_reports() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 16, 16);
    let output = directory.path().join("out.mp4");

    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });
    let options = WatermarkOptions::new()
        .with_encoder(fixture_encoder_options())
        .with_progress(recorder.clone())
        .with_batch_size(5);
    Watermarker::new(options)
        .run(&input, &logo, &output)
        .expect("watermark");

    let currents: Vec<u64> = recorder
        .infos
        .lock()
        .unwrap()
        .iter()
        .map(|info| info.current)
        .collect();
    assert_eq!(currents, vec![5, 10, 10]);
}

#[test]
fn cancelled_run_returns_error() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 16, 16);
    let output = directory.path().join("cancelled.mp4");

    let token = CancellationToken::new();
    token.cancel();
    let options = WatermarkOptions::new()
        .with_encoder(fixture_encoder_options())
        .with_cancellation(token);

    match Watermarker::new(options).run(&input, &logo, &output) {
        Err(WatermarkError::Cancelled { frames_written }) => assert_eq!(frames_written, 0),
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
}

/// Records every report and cancels the run once `stop_after` frames are done.
struct CancelAfter {
    token: CancellationToken,
    stop_after: u64,
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
        if info.current >= self.stop_after {
            self.token.cancel();
        }
    }
}

#[test]
fn cancelling_mid_run_keeps_written_frames() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 16, 16);
    let output = directory.path().join("partial.mp4");

    let token = CancellationToken::new();
    let recorder = Arc::new(CancelAfter {
        token: token.clone(),
        stop_after: 4,
        infos: Mutex::new(Vec::new()),
    });
    let options = WatermarkOptions::new()
        .with_encoder(fixture_encoder_options())
        .with_progress(recorder.clone())
        .with_cancellation(token)
        .with_batch_size(1);

    match Watermarker::new(options).run(&input, &logo, &output) {
        Err(WatermarkError::Cancelled { frames_written }) => assert_eq!(frames_written, 4),
        other => panic!("Expected Cancelled, got: {other:?}"),
    }

    let infos = recorder.infos.lock().unwrap();
    let last = infos.last().expect("at least one report");
    assert!(last.finished);
    assert_eq!(last.current, 4);
    assert_eq!(last.percent, Some(40));
    assert_eq!(infos.iter().filter(|info| info.finished).count(), 1);

    let mut source = VideoSource::open(&output).expect("partial output opens");
    let decoded = source.frames().expect("frame iterator").count();
    assert_eq!(decoded, 4);
}

#[test]
fn spawned_job_can_be_cancelled() {
    let directory = tempfile::tempdir().expect("temp dir");
    let Some(input) = write_fixture(directory.path()) else {
        return;
    };
    let logo = write_red_logo(directory.path(), 16, 16);
    let output = directory.path().join("job.mp4");

    let token = CancellationToken::new();
    let options = WatermarkOptions::new()
        .with_encoder(fixture_encoder_options())
        .with_cancellation(token.clone());
    token.cancel();

    let job = Watermarker::new(options)
        .spawn(&input, &logo, &output)
        .expect("spawn");
    assert!(job.cancellation_token().is_cancelled());
    assert!(matches!(job.join(), Err(WatermarkError::Cancelled { .. })));
}
