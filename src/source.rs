//! Input side of the pipeline: open a video file, read its properties, and
//! decode frames one at a time.
//!
//! [`VideoSource`] owns the FFmpeg demuxer and the cached
//! [`VideoMetadata`]. [`VideoSource::frames`] returns a [`FrameIterator`]
//! that yields every frame in presentation order as an RGB image at source
//! resolution.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    conversion::frame_to_rgb_image,
    error::WatermarkError,
    metadata::{VideoMetadata, rational_to_fps, resolve_frame_count},
};

/// An opened input video.
///
/// # Example
///
/// ```no_run
/// use vidmark::{VideoSource, WatermarkError};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// for frame in source.frames()? {
///     let (index, image) = frame?;
///     println!("frame {index}: {}x{}", image.width(), image.height());
/// }
/// # Ok::<(), WatermarkError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    metadata: VideoMetadata,
    video_stream_index: usize,
    path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file and read its stream properties.
    ///
    /// Initialises FFmpeg (idempotent) and selects FFmpeg's "best" video
    /// stream.
    ///
    /// # Errors
    ///
    /// - [`WatermarkError::FileOpen`] if the file cannot be opened or its
    ///   codec parameters cannot be read.
    /// - [`WatermarkError::NoVideoStream`] if the file has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video source: {}", path.display());

        ffmpeg_next::init().map_err(|error| WatermarkError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| WatermarkError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(WatermarkError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(
            |error| WatermarkError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to read video codec parameters: {error}"),
            },
        )?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| WatermarkError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frame_rate = {
            let average = stream.avg_frame_rate();
            if rational_to_fps(average) > 0.0 {
                average
            } else {
                stream.rate()
            }
        };
        let frames_per_second = rational_to_fps(frame_rate);
        let frame_count = resolve_frame_count(stream.frames(), duration, frames_per_second);

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frame_rate,
            frames_per_second,
            frame_count,
            duration,
            codec,
            bit_rate: decoder.bit_rate(),
            format: input_context.format().name().to_string(),
        };

        log::debug!(
            "Video stream {video_stream_index}: {}x{} @ {:.3} fps, {} frame(s), codec {}",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            path,
        })
    }

    /// Cached stream properties.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate over every frame from the current read position.
    ///
    /// A freshly opened source starts at the first frame. The iterator
    /// borrows the source mutably; it cannot be rewound.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be created.
    pub fn frames(&mut self) -> Result<FrameIterator<'_>, WatermarkError> {
        FrameIterator::new(self)
    }

    /// Decode the first frame. Used for previews.
    ///
    /// # Errors
    ///
    /// - [`WatermarkError::VideoDecodeError`] if the stream yields no frame.
    /// - Any decoding error from the underlying iterator.
    pub fn first_frame(&mut self) -> Result<RgbImage, WatermarkError> {
        match self.frames()?.next() {
            Some(result) => result.map(|(_, image)| image),
            None => Err(WatermarkError::VideoDecodeError(
                "video stream contains no decodable frames".to_string(),
            )),
        }
    }
}

/// A lazy iterator over decoded frames, converted to RGB24.
///
/// Yields `(frame_index, image)` where `frame_index` counts from zero in
/// the order frames leave the decoder.
pub struct FrameIterator<'a> {
    input_context: &'a mut Input,
    decoder: VideoDecoder,
    scaler: Option<(ScalingContext, (Pixel, u32, u32))>,
    video_stream_index: usize,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    next_index: u64,
    eof_sent: bool,
    done: bool,
}

impl<'a> FrameIterator<'a> {
    fn new(source: &'a mut VideoSource) -> Result<Self, WatermarkError> {
        let stream = source
            .input_context
            .stream(source.video_stream_index)
            .ok_or(WatermarkError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        Ok(Self {
            input_context: &mut source.input_context,
            decoder,
            scaler: None,
            video_stream_index: source.video_stream_index,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            next_index: 0,
            eof_sent: false,
            done: false,
        })
    }

    /// Convert the current decoded frame to RGB24 at its own resolution.
    ///
    /// The scaler is (re)built whenever the decoded format or size changes.
    fn convert_current_frame(&mut self) -> Result<RgbImage, WatermarkError> {
        let key = (
            self.decoded_frame.format(),
            self.decoded_frame.width(),
            self.decoded_frame.height(),
        );

        let stale = self.scaler.as_ref().is_none_or(|(_, current)| *current != key);
        if stale {
            let (format, width, height) = key;
            let context = ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some((context, key));
            self.rgb_frame = VideoFrame::empty();
        }

        if let Some((scaler, _)) = self.scaler.as_mut() {
            scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        }
        frame_to_rgb_image(&self.rgb_frame)
    }
}

impl Iterator for FrameIterator<'_> {
    type Item = Result<(u64, RgbImage), WatermarkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let index = self.next_index;
                return match self.convert_current_frame() {
                    Ok(image) => {
                        self.next_index += 1;
                        Some(Ok((index, image)))
                    }
                    Err(error) => {
                        self.done = true;
                        Some(Err(error))
                    }
                };
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut *self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(WatermarkError::VideoDecodeError(format!(
                                "send_packet failed at frame {}: {error}",
                                self.next_index
                            ))));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(WatermarkError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}
