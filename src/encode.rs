//! Output side of the pipeline: encode RGB frames into a video file.
//!
//! [`VideoEncoder`] is a streaming writer. Frames are pushed one at a time
//! with [`write_frame`](VideoEncoder::write_frame) and the file is finalised
//! with [`finish`](VideoEncoder::finish). Frame `N` gets presentation
//! timestamp `N` in a `1 / frame_rate` time base, so output order and timing
//! match input order.
//!
//! # Example
//!
//! ```no_run
//! use ffmpeg_next::Rational;
//! use image::RgbImage;
//! use vidmark::{EncoderOptions, VideoEncoder, WatermarkError};
//!
//! let mut encoder = VideoEncoder::create(
//!     "out.mp4",
//!     320,
//!     240,
//!     Rational::new(25, 1),
//!     &EncoderOptions::default(),
//! )?;
//! for _ in 0..25 {
//!     encoder.write_frame(&RgbImage::new(320, 240))?;
//! }
//! encoder.finish()?;
//! # Ok::<(), WatermarkError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    encoder::video::Encoder as OpenedVideoEncoder,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{conversion::rgb_image_to_frame, error::WatermarkError};

/// Bits per pixel per frame used to derive an MPEG-4 bitrate when none is
/// given.
const MPEG4_BITS_PER_PIXEL: f64 = 0.15;

/// Lower bound for a derived MPEG-4 bitrate; small frames starve otherwise.
const MPEG4_MIN_BITRATE: usize = 400_000;

/// Frame rate (frames per second) used when the caller passes a zero or
/// negative rate.
const FALLBACK_FPS: i32 = 25;

/// Largest numerator or denominator accepted in an encoder time base.
/// MPEG-4 Part 2 stores the time base in 16 bits.
const MAX_TIME_BASE_COMPONENT: i32 = 65535;

/// Frame rate to configure on the encoder.
///
/// Non-positive rates fall back to [`FALLBACK_FPS`]. Rates whose terms do
/// not fit in 16 bits (common for variable frame rate phone footage, e.g.
/// `1800000/60061`) are approximated by the nearest fraction that does.
pub(crate) fn encoder_frame_rate(frame_rate: Rational) -> Rational {
    if frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 {
        log::warn!("Invalid frame rate {frame_rate}; falling back to {FALLBACK_FPS} fps");
        return Rational::new(FALLBACK_FPS, 1);
    }
    if frame_rate.numerator() <= MAX_TIME_BASE_COMPONENT
        && frame_rate.denominator() <= MAX_TIME_BASE_COMPONENT
    {
        return frame_rate;
    }

    let fps = f64::from(frame_rate);
    let approximated =
        Rational::from(unsafe { ffmpeg_sys_next::av_d2q(fps, MAX_TIME_BASE_COMPONENT) });
    if approximated.numerator() <= 0 || approximated.denominator() <= 0 {
        let rounded = (fps.round() as i32).clamp(1, MAX_TIME_BASE_COMPONENT);
        log::debug!("Frame rate {frame_rate} rounded to {rounded} fps");
        return Rational::new(rounded, 1);
    }
    log::debug!("Frame rate {frame_rate} approximated as {approximated}");
    approximated
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// MPEG-4 Part 2 (`mp4v`). Available in every FFmpeg build.
    #[default]
    Mpeg4,
    /// H.264 / AVC. Requires an H.264 encoder such as libx264.
    H264,
    /// H.265 / HEVC. Requires an HEVC encoder such as libx265.
    H265,
}

impl VideoCodec {
    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::Mpeg4 => Id::MPEG4,
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
        }
    }

    fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

impl FromStr for VideoCodec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mpeg4" | "mp4v" => Ok(VideoCodec::Mpeg4),
            "h264" | "avc" | "x264" => Ok(VideoCodec::H264),
            "h265" | "hevc" | "x265" => Ok(VideoCodec::H265),
            other => Err(format!("unsupported codec: {other}")),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Default)]
pub struct EncoderOptions {
    /// Codec to use. Default is MPEG-4.
    pub codec: VideoCodec,
    /// Constant Rate Factor (0-51, lower is better) for H.264/H.265.
    /// Defaults to the encoder's own default when `None`.
    pub crf: Option<u32>,
    /// Bitrate in bits per second. Takes precedence over CRF.
    pub bitrate: Option<usize>,
}

impl EncoderOptions {
    /// Set the codec.
    #[must_use]
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the CRF quality value.
    #[must_use]
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf.min(51));
        self
    }

    /// Set the target bitrate in bits per second.
    #[must_use]
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Bitrate to configure on the encoder, if any.
    ///
    /// An explicit bitrate always wins. MPEG-4 has no CRF mode, so without
    /// one it gets a bitrate derived from resolution and frame rate.
    pub(crate) fn effective_bitrate(
        &self,
        width: u32,
        height: u32,
        frame_rate: Rational,
    ) -> Option<usize> {
        if self.bitrate.is_some() || self.codec.supports_crf() {
            return self.bitrate;
        }
        let fps = if frame_rate.denominator() > 0 && frame_rate.numerator() > 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            f64::from(FALLBACK_FPS)
        };
        let derived = (width as f64 * height as f64 * fps * MPEG4_BITS_PER_PIXEL) as usize;
        Some(derived.max(MPEG4_MIN_BITRATE))
    }
}

/// A streaming video writer.
///
/// Dropping the encoder without calling [`finish`](VideoEncoder::finish)
/// leaves the output without a trailer.
pub struct VideoEncoder {
    output: Output,
    encoder: OpenedVideoEncoder,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    rgb_frame: VideoFrame,
    yuv_frame: VideoFrame,
    width: u32,
    height: u32,
    frames_written: u64,
    path: PathBuf,
}

impl Debug for VideoEncoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoEncoder")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

impl VideoEncoder {
    /// Create the output file and open the encoder.
    ///
    /// The container format is inferred from the file extension.
    ///
    /// # Errors
    ///
    /// - [`WatermarkError::VideoWriteError`] if the output cannot be created
    ///   or its header cannot be written.
    /// - [`WatermarkError::VideoEncodeError`] if the codec is unavailable or
    ///   refuses the configuration.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        frame_rate: Rational,
        options: &EncoderOptions,
    ) -> Result<Self, WatermarkError> {
        let path = path.as_ref().to_path_buf();
        ffmpeg_next::init()?;

        let frame_rate = encoder_frame_rate(frame_rate);
        let encoder_time_base = frame_rate.invert();
        let target_pixel = Pixel::YUV420P;
        let codec_id = options.codec.to_codec_id();

        log::info!(
            "Opening encoder for {} ({width}x{height}, codec={:?}, rate={frame_rate})",
            path.display(),
            options.codec,
        );

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|e| WatermarkError::VideoWriteError(format!("cannot open output: {e}")))?;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let encoder_codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            WatermarkError::VideoEncodeError(format!("codec {codec_id:?} not available"))
        })?;

        let (encoder, stream_index) = {
            let mut stream = output
                .add_stream(encoder_codec)
                .map_err(|e| WatermarkError::VideoWriteError(format!("cannot add stream: {e}")))?;
            let stream_index = stream.index();

            let mut encoder = CodecContext::from_parameters(stream.parameters())
                .map_err(|e| {
                    WatermarkError::VideoEncodeError(format!("cannot create codec context: {e}"))
                })?
                .encoder()
                .video()
                .map_err(|e| {
                    WatermarkError::VideoEncodeError(format!("cannot open video encoder: {e}"))
                })?;

            encoder.set_width(width);
            encoder.set_height(height);
            encoder.set_format(target_pixel);
            encoder.set_time_base(encoder_time_base);
            encoder.set_frame_rate(Some(frame_rate));

            if let Some(bitrate) = options.effective_bitrate(width, height, frame_rate) {
                encoder.set_bit_rate(bitrate);
            }

            if needs_global_header {
                unsafe {
                    (*encoder.as_mut_ptr()).flags |=
                        ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
                }
            }

            let mut codec_options = Dictionary::new();
            if options.bitrate.is_none() && options.codec.supports_crf() {
                if let Some(crf) = options.crf {
                    codec_options.set("crf", &crf.to_string());
                }
            }

            let opened = encoder
                .open_as_with(encoder_codec, codec_options)
                .map_err(|e| {
                    WatermarkError::VideoEncodeError(format!("cannot open encoder: {e}"))
                })?;

            stream.set_time_base(encoder_time_base);
            stream.set_parameters(&opened);
            (opened, stream_index)
        };

        output
            .write_header()
            .map_err(|e| WatermarkError::VideoWriteError(format!("cannot write header: {e}")))?;

        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| WatermarkError::VideoWriteError("output stream vanished".to_string()))?;

        let scaler = ScalingContext::get(
            Pixel::RGB24,
            width,
            height,
            target_pixel,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| WatermarkError::VideoWriteError(format!("cannot create scaler: {e}")))?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            rgb_frame: VideoFrame::new(Pixel::RGB24, width, height),
            yuv_frame: VideoFrame::empty(),
            width,
            height,
            frames_written: 0,
            path,
        })
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Encode one frame. It must match the encoder's size exactly.
    ///
    /// # Errors
    ///
    /// - [`WatermarkError::VideoWriteError`] for a size mismatch or a muxer
    ///   failure.
    /// - [`WatermarkError::VideoEncodeError`] if the encoder rejects the frame.
    pub fn write_frame(&mut self, image: &RgbImage) -> Result<(), WatermarkError> {
        if image.dimensions() != (self.width, self.height) {
            return Err(WatermarkError::VideoWriteError(format!(
                "frame {} is {}x{}, encoder expects {}x{}",
                self.frames_written,
                image.width(),
                image.height(),
                self.width,
                self.height,
            )));
        }

        rgb_image_to_frame(image, &mut self.rgb_frame);
        self.scaler
            .run(&self.rgb_frame, &mut self.yuv_frame)
            .map_err(|e| WatermarkError::VideoWriteError(format!("scaling failed: {e}")))?;
        self.yuv_frame.set_pts(Some(self.frames_written as i64));

        self.encoder
            .send_frame(&self.yuv_frame)
            .map_err(|e| WatermarkError::VideoEncodeError(format!("send_frame failed: {e}")))?;
        self.drain_packets()?;

        self.frames_written += 1;
        Ok(())
    }

    /// Flush the encoder, write the trailer, and close the file.
    ///
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// Any encoder or muxer failure during the flush.
    pub fn finish(mut self) -> Result<u64, WatermarkError> {
        self.encoder
            .send_eof()
            .map_err(|e| WatermarkError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        self.drain_packets()?;

        self.output
            .write_trailer()
            .map_err(|e| WatermarkError::VideoWriteError(format!("cannot write trailer: {e}")))?;

        log::info!(
            "Finished {} ({} frame(s))",
            self.path.display(),
            self.frames_written
        );
        Ok(self.frames_written)
    }

    fn drain_packets(&mut self) -> Result<(), WatermarkError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| WatermarkError::VideoWriteError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}
