//! Video stream properties.
//!
//! [`VideoMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and drives the output encoder: the composited file keeps the
//! source's resolution and frame rate.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Properties of the video stream being watermarked.
///
/// # Example
///
/// ```no_run
/// use vidmark::VideoSource;
///
/// let source = VideoSource::open("input.mp4").unwrap();
/// let metadata = source.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Exact frame rate as reported by the container.
    pub frame_rate: Rational,
    /// Frame rate as a float (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Number of frames. Taken from the container when declared, otherwise
    /// estimated from duration and frame rate. Zero when unknown.
    pub frame_count: u64,
    /// Duration of the container.
    pub duration: Duration,
    /// Decoder name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
    /// Stream bit rate in bits per second, or zero when unknown.
    pub bit_rate: usize,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl VideoMetadata {
    /// Frame count if known, `None` otherwise.
    pub fn known_frame_count(&self) -> Option<u64> {
        (self.frame_count > 0).then_some(self.frame_count)
    }
}

/// Convert a rational frame rate to frames per second, returning `0.0` for
/// a zero denominator.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}

/// Resolve the frame count from the stream's declared count, falling back to
/// an estimate from duration and frame rate.
pub(crate) fn resolve_frame_count(
    declared: i64,
    duration: Duration,
    frames_per_second: f64,
) -> u64 {
    if declared > 0 {
        declared as u64
    } else if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second) as u64
    } else {
        0
    }
}
