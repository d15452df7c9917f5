//! # vidmark
//!
//! Stamp a logo onto every frame of a video file.
//!
//! `vidmark` decodes a video with FFmpeg (via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), alpha-blends an
//! RGBA logo at a fixed offset onto each frame, and encodes the result to a
//! new file with the source's resolution and frame rate. Progress is reported
//! as the percentage of frames processed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidmark::{Watermarker, WatermarkOptions};
//!
//! let report = Watermarker::new(WatermarkOptions::default())
//!     .run("input.mp4", "logo.png", "input_watermarked.mp4")?;
//! println!("{} frames", report.frames_written);
//! # Ok::<(), vidmark::WatermarkError>(())
//! ```
//!
//! ### On a worker thread
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidmark::{ChannelProgress, WatermarkOptions, Watermarker};
//!
//! let (progress, updates) = ChannelProgress::new();
//! let options = WatermarkOptions::new().with_progress(Arc::new(progress));
//! let job = Watermarker::new(options).spawn("input.mp4", "logo.png", "out.mp4")?;
//!
//! for update in updates {
//!     if let Some(percent) = update.percent {
//!         println!("{percent}%");
//!     }
//! }
//! let report = job.join()?;
//! # Ok::<(), vidmark::WatermarkError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod composite;
pub mod config;
mod conversion;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod logo;
pub mod metadata;
pub mod placement;
pub mod progress;
pub mod source;
pub mod watermark;

pub use composite::{Overlay, blend};
pub use config::WatermarkOptions;
pub use encode::{EncoderOptions, VideoCodec, VideoEncoder};
pub use error::WatermarkError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use logo::{Logo, LogoScale};
pub use metadata::VideoMetadata;
pub use placement::{Placement, Position};
pub use progress::{
    CancellationToken, ChannelProgress, ProgressCallback, ProgressInfo, percent_complete,
};
pub use source::{FrameIterator, VideoSource};
pub use watermark::{
    OUTPUT_SUFFIX, WatermarkJob, WatermarkReport, Watermarker, default_output_path,
};
