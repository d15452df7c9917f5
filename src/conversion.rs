//! Pixel-buffer copies between FFmpeg frames and `image` buffers.
//!
//! FFmpeg rows are padded to `stride` bytes; `image` buffers are tightly
//! packed. These helpers do the row-by-row copy in both directions.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use image::RgbImage;

use crate::error::WatermarkError;

/// Copy an RGB24 FFmpeg frame into a tightly-packed [`RgbImage`].
pub(crate) fn frame_to_rgb_image(frame: &VideoFrame) -> Result<RgbImage, WatermarkError> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let row_len = width as usize * 3;
    let data = frame.data(0);

    let buffer = if stride == row_len {
        data[..row_len * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_len]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        WatermarkError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}

/// Copy an [`RgbImage`] into an RGB24 FFmpeg frame of the same size.
pub(crate) fn rgb_image_to_frame(image: &RgbImage, frame: &mut VideoFrame) {
    debug_assert_eq!(frame.format(), Pixel::RGB24);
    let row_len = image.width() as usize * 3;
    let stride = frame.stride(0);
    let source = image.as_raw();
    let destination = frame.data_mut(0);

    for row in 0..image.height() as usize {
        let src_start = row * row_len;
        let dst_start = row * stride;
        destination[dst_start..dst_start + row_len]
            .copy_from_slice(&source[src_start..src_start + row_len]);
    }
}
