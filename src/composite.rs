//! Per-frame alpha blending.
//!
//! Blending is standard linear "over" compositing of an RGBA logo onto an
//! opaque RGB frame:
//!
//! ```text
//! a   = logo_alpha * opacity
//! out = a * logo + (1 - a) * frame
//! ```
//!
//! rounded to nearest once per channel. Only the part of the logo that
//! intersects the frame is drawn.

use image::{RgbImage, RgbaImage};

use crate::{
    error::WatermarkError,
    logo::{Logo, LogoScale},
    placement::Placement,
};

/// Check that an opacity lies in `0.0..=1.0`.
///
/// # Errors
///
/// [`WatermarkError::InvalidOpacity`] otherwise, including for NaN.
pub fn validate_opacity(opacity: f32) -> Result<f32, WatermarkError> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(WatermarkError::InvalidOpacity(opacity));
    }
    Ok(opacity)
}

/// Blend `logo` onto `frame` with its top-left corner at `(x, y)`.
///
/// `opacity` scales the logo's own alpha (1.0 = as-is, 0.0 = invisible).
/// Returns `false` if the logo does not intersect the frame, in which case
/// the frame is untouched.
pub fn blend(frame: &mut RgbImage, logo: &RgbaImage, x: i64, y: i64, opacity: f32) -> bool {
    let frame_width = i64::from(frame.width());
    let frame_height = i64::from(frame.height());

    let left = x.max(0);
    let top = y.max(0);
    let right = x.saturating_add(i64::from(logo.width())).min(frame_width);
    let bottom = y.saturating_add(i64::from(logo.height())).min(frame_height);
    if left >= right || top >= bottom {
        return false;
    }
    if opacity <= 0.0 {
        return true;
    }

    let opacity = f64::from(opacity.min(1.0));
    let frame_stride = frame.width() as usize * 3;
    let logo_stride = logo.width() as usize * 4;
    let columns = (right - left) as usize;
    let logo_left = (left - x) as usize;
    let frame_pixels: &mut [u8] = frame;
    let logo_pixels = logo.as_raw();

    for frame_row in top..bottom {
        let logo_row = (frame_row - y) as usize;
        let frame_start = frame_row as usize * frame_stride + left as usize * 3;
        let logo_start = logo_row * logo_stride + logo_left * 4;

        let destination = &mut frame_pixels[frame_start..frame_start + columns * 3];
        let source = &logo_pixels[logo_start..logo_start + columns * 4];

        for (dst, src) in destination.chunks_exact_mut(3).zip(source.chunks_exact(4)) {
            if src[3] == 0 {
                continue;
            }
            let alpha = f64::from(src[3]) / 255.0 * opacity;
            let inverse = 1.0 - alpha;
            for channel in 0..3 {
                let blended = alpha * f64::from(src[channel]) + inverse * f64::from(dst[channel]);
                dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    true
}

/// The logo at its final size and offset, ready to stamp onto frames.
///
/// Built once per video with [`Overlay::prepare`] and applied to every
/// frame with [`Overlay::apply`].
#[derive(Debug, Clone)]
pub struct Overlay {
    image: RgbaImage,
    x: i64,
    y: i64,
    opacity: f32,
}

impl Overlay {
    /// Size and position `logo` for frames of `frame_width` x `frame_height`.
    ///
    /// # Errors
    ///
    /// - [`WatermarkError::InvalidScale`] / [`WatermarkError::InvalidLogoSize`]
    ///   for a bad `scale`.
    /// - [`WatermarkError::InvalidOpacity`] for an opacity outside `0..=1`.
    pub fn prepare(
        logo: &Logo,
        frame_width: u32,
        frame_height: u32,
        scale: LogoScale,
        placement: Placement,
        opacity: f32,
    ) -> Result<Self, WatermarkError> {
        let opacity = validate_opacity(opacity)?;
        let image = logo.sized_for(scale, frame_width, frame_height)?;
        let (x, y) = placement.offset(frame_width, frame_height, image.width(), image.height());

        let overlay = Self {
            image,
            x,
            y,
            opacity,
        };

        if !overlay.intersects(frame_width, frame_height) {
            log::warn!(
                "Logo at ({x}, {y}) sized {}x{} lies outside the \
                 {frame_width}x{frame_height} frame; frames will pass through unchanged",
                overlay.image.width(),
                overlay.image.height(),
            );
        } else {
            log::debug!(
                "Overlay {}x{} at ({x}, {y}), opacity {opacity}",
                overlay.image.width(),
                overlay.image.height(),
            );
        }

        Ok(overlay)
    }

    /// Stamp the overlay onto a frame in place.
    pub fn apply(&self, frame: &mut RgbImage) {
        blend(frame, &self.image, self.x, self.y, self.opacity);
    }

    /// Top-left offset of the logo on the frame.
    pub fn offset(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Sized logo bitmap.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn intersects(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x < i64::from(frame_width)
            && self.y < i64::from(frame_height)
            && self.x.saturating_add(i64::from(self.image.width())) > 0
            && self.y.saturating_add(i64::from(self.image.height())) > 0
    }
}
