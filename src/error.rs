//! Error types for the `vidmark` crate.
//!
//! [`WatermarkError`] is the single error type returned by every fallible
//! operation in the crate. Variants carry the path, frame index, or upstream
//! message needed to diagnose a failure without extra logging at the call
//! site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `vidmark` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatermarkError {
    /// The input video could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The input file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The logo image could not be loaded.
    #[error("Failed to load logo image at {path}: {reason}")]
    LogoLoad {
        /// Path of the logo image.
        path: PathBuf,
        /// Underlying reason the load failed.
        reason: String,
    },

    /// A scale factor was zero, negative, or not finite.
    #[error("Invalid logo scale {0}: must be a finite value greater than zero")]
    InvalidScale(f32),

    /// An opacity outside `0.0..=1.0` was provided.
    #[error("Invalid opacity {0}: must be between 0.0 and 1.0")]
    InvalidOpacity(f32),

    /// An explicit logo size had a zero dimension.
    #[error("Invalid logo size {width}x{height}: both dimensions must be non-zero")]
    InvalidLogoSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The encoder could not be found, configured, or fed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// The output container could not be written.
    #[error("Video write error: {0}")]
    VideoWriteError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled after {frames_written} frame(s)")]
    Cancelled {
        /// Frames that were fully written before the cancellation was seen.
        frames_written: u64,
    },

    /// The worker thread running a [`WatermarkJob`](crate::WatermarkJob) panicked.
    #[error("Watermark worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<FfmpegError> for WatermarkError {
    fn from(error: FfmpegError) -> Self {
        WatermarkError::FfmpegError(error.to_string())
    }
}
