//! The frame loop: decode, blend, encode, report.
//!
//! [`Watermarker::run`] performs the whole transformation on the calling
//! thread. [`Watermarker::spawn`] moves the same work onto a single worker
//! thread and returns a [`WatermarkJob`] handle, which is what an
//! interactive front end wants.

use std::{
    any::Any,
    path::{Path, PathBuf},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use image::{RgbImage, imageops::FilterType};

use crate::{
    composite::Overlay,
    config::WatermarkOptions,
    encode::{VideoCodec, VideoEncoder},
    error::WatermarkError,
    logo::Logo,
    progress::{CancellationToken, ProgressTracker},
    source::VideoSource,
};

/// Suffix appended to the input stem by [`default_output_path`].
pub const OUTPUT_SUFFIX: &str = "_watermarked";

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct WatermarkReport {
    /// Path of the written file.
    pub output: PathBuf,
    /// Frames decoded, composited and written.
    pub frames_written: u64,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// `<dir>/<stem>_watermarked.mp4` next to the input.
///
/// ```
/// use std::path::Path;
///
/// let output = vidmark::default_output_path("clips/holiday.avi");
/// assert_eq!(output, Path::new("clips/holiday_watermarked.mp4"));
/// ```
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.mp4"))
}

/// Applies a logo to videos according to a [`WatermarkOptions`].
///
/// # Example
///
/// ```no_run
/// use vidmark::{LogoScale, WatermarkOptions, Watermarker};
///
/// let options = WatermarkOptions::new().with_scale(LogoScale::FrameFraction(0.2));
/// let report = Watermarker::new(options).run("input.mp4", "logo.png", "output.mp4")?;
/// println!("wrote {} frames", report.frames_written);
/// # Ok::<(), vidmark::WatermarkError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Watermarker {
    options: WatermarkOptions,
}

impl Watermarker {
    /// Create a watermarker.
    pub fn new(options: WatermarkOptions) -> Self {
        Self { options }
    }

    /// The options this watermarker runs with.
    pub fn options(&self) -> &WatermarkOptions {
        &self.options
    }

    /// Load the logo from `logo` and watermark `input` into `output`.
    ///
    /// # Errors
    ///
    /// Any open, load, decode, or encode failure, or
    /// [`WatermarkError::Cancelled`] if the cancellation token fires.
    pub fn run<I, L, O>(
        &self,
        input: I,
        logo: L,
        output: O,
    ) -> Result<WatermarkReport, WatermarkError>
    where
        I: AsRef<Path>,
        L: AsRef<Path>,
        O: AsRef<Path>,
    {
        self.options.validate()?;
        let logo = Logo::open(logo)?;
        self.run_with_logo(input, &logo, output)
    }

    /// Watermark `input` into `output` with an already-loaded logo.
    ///
    /// The output has the source's resolution and frame rate. Frames are
    /// written in the order they are decoded. On cancellation the frames
    /// written so far are finalised into a playable file before
    /// [`WatermarkError::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// See [`run`](Watermarker::run).
    pub fn run_with_logo<I, O>(
        &self,
        input: I,
        logo: &Logo,
        output: O,
    ) -> Result<WatermarkReport, WatermarkError>
    where
        I: AsRef<Path>,
        O: AsRef<Path>,
    {
        let started = Instant::now();
        let output = output.as_ref().to_path_buf();
        self.options.validate()?;

        let mut source = VideoSource::open(input)?;
        let metadata = source.metadata().clone();
        let (width, height) = (metadata.width, metadata.height);

        let overlay = Overlay::prepare(
            logo,
            width,
            height,
            self.options.scale,
            self.options.placement,
            self.options.opacity,
        )?;

        let mut encoder_options = self.options.encoder.clone();
        if encoder_options.codec == VideoCodec::Mpeg4
            && encoder_options.bitrate.is_none()
            && metadata.bit_rate > 0
        {
            encoder_options.bitrate = Some(metadata.bit_rate);
        }

        log::info!(
            "Watermarking {} -> {} ({width}x{height}, {} frame(s))",
            source.path().display(),
            output.display(),
            metadata.frame_count,
        );

        let mut encoder =
            VideoEncoder::create(&output, width, height, metadata.frame_rate, &encoder_options)?;
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            metadata.known_frame_count(),
            self.options.batch_size,
        );

        for frame in source.frames()? {
            if self.options.is_cancelled() {
                let frames_written = encoder.frames_written();
                log::info!("Cancelled after {frames_written} frame(s); finalising partial output");
                if let Err(error) = encoder.finish() {
                    log::warn!("Failed to finalise partial output: {error}");
                }
                tracker.abort();
                return Err(WatermarkError::Cancelled { frames_written });
            }

            let (index, mut image) = frame?;
            if image.dimensions() != (width, height) {
                return Err(WatermarkError::VideoDecodeError(format!(
                    "frame {index} is {}x{}, stream was opened as {width}x{height}",
                    image.width(),
                    image.height(),
                )));
            }

            overlay.apply(&mut image);
            encoder.write_frame(&image)?;
            tracker.advance();
        }

        let frames_written = encoder.finish()?;
        tracker.finish();

        if frames_written == 0 {
            log::warn!("No frames were decoded from the input; output contains no video frames");
        }

        Ok(WatermarkReport {
            output,
            frames_written,
            width,
            height,
            elapsed: started.elapsed(),
        })
    }

    /// Run [`run`](Watermarker::run) on a dedicated worker thread.
    ///
    /// If the options carry no cancellation token one is created, so the
    /// returned job can always be cancelled.
    ///
    /// # Errors
    ///
    /// [`WatermarkError::IoError`] if the thread cannot be spawned.
    pub fn spawn<I, L, O>(
        self,
        input: I,
        logo: L,
        output: O,
    ) -> Result<WatermarkJob, WatermarkError>
    where
        I: AsRef<Path>,
        L: AsRef<Path>,
        O: AsRef<Path>,
    {
        let token = self.options.cancellation.clone().unwrap_or_default();
        let watermarker = Watermarker::new(self.options.with_cancellation(token.clone()));

        let input = input.as_ref().to_path_buf();
        let logo = logo.as_ref().to_path_buf();
        let output = output.as_ref().to_path_buf();

        let handle = std::thread::Builder::new()
            .name("vidmark-worker".to_string())
            .spawn(move || watermarker.run(input, logo, output))?;

        Ok(WatermarkJob { handle, token })
    }

    /// Render the first frame of `input` with the logo applied.
    ///
    /// When `max_height` is given and differs from the frame height, the
    /// result is scaled to that height keeping the aspect ratio.
    ///
    /// # Errors
    ///
    /// Any open, load, or decode failure.
    pub fn preview<I, L>(
        &self,
        input: I,
        logo: L,
        max_height: Option<u32>,
    ) -> Result<RgbImage, WatermarkError>
    where
        I: AsRef<Path>,
        L: AsRef<Path>,
    {
        self.options.validate()?;
        let logo = Logo::open(logo)?;
        let mut source = VideoSource::open(input)?;
        let mut frame = source.first_frame()?;

        let overlay = Overlay::prepare(
            &logo,
            frame.width(),
            frame.height(),
            self.options.scale,
            self.options.placement,
            self.options.opacity,
        )?;
        overlay.apply(&mut frame);

        Ok(match max_height {
            Some(target) if target > 0 && target != frame.height() => {
                let (width, height) = scaled_to_height(frame.width(), frame.height(), target);
                image::imageops::resize(&frame, width, height, FilterType::Triangle)
            }
            _ => frame,
        })
    }
}

/// Dimensions after scaling `(width, height)` to `target_height`, keeping
/// the aspect ratio.
fn scaled_to_height(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    if height == 0 {
        return (width, target_height);
    }
    let ratio = target_height as f64 / height as f64;
    let scaled_width = (width as f64 * ratio).round() as u32;
    (scaled_width.max(1), target_height)
}

/// A watermarking run on a worker thread.
///
/// Created by [`Watermarker::spawn`].
#[derive(Debug)]
pub struct WatermarkJob {
    handle: JoinHandle<Result<WatermarkReport, WatermarkError>>,
    token: CancellationToken,
}

impl WatermarkJob {
    /// Ask the worker to stop before its next frame.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token shared with the worker.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the worker has exited. `false` means "processing".
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result.
    ///
    /// # Errors
    ///
    /// The run's own error, or [`WatermarkError::WorkerPanicked`].
    pub fn join(self) -> Result<WatermarkReport, WatermarkError> {
        self.handle
            .join()
            .map_err(|payload| WatermarkError::WorkerPanicked(panic_message(payload.as_ref())))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{default_output_path, panic_message, scaled_to_height};

    #[test]
    fn output_path_keeps_directory() {
        assert_eq!(
            default_output_path("/videos/trip.mov"),
            Path::new("/videos/trip_watermarked.mp4")
        );
        assert_eq!(
            default_output_path("clip"),
            Path::new("clip_watermarked.mp4")
        );
    }

    #[test]
    fn output_path_uses_last_extension_only() {
        assert_eq!(
            default_output_path("a.b/c.d.mp4"),
            Path::new("a.b/c.d_watermarked.mp4")
        );
    }

    #[test]
    fn preview_scaling_keeps_aspect() {
        assert_eq!(scaled_to_height(1920, 1080, 400), (711, 400));
        assert_eq!(scaled_to_height(640, 480, 240), (320, 240));
    }

    #[test]
    fn panic_payloads_render() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
