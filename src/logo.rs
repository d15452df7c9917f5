//! Loading and sizing the overlay bitmap.
//!
//! The logo is read once per run, converted to RGBA8 and resized to its
//! final on-frame size before the first frame is decoded.

use std::path::{Path, PathBuf};

use image::{RgbaImage, imageops::FilterType};

use crate::error::WatermarkError;

/// How the logo is sized relative to itself or to the video frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogoScale {
    /// Keep the logo's own pixel size.
    Original,
    /// Multiply the logo's own width and height by the factor.
    Factor(f32),
    /// Set width to `frame_width * f` and height to `frame_height * f`.
    ///
    /// This follows the frame's aspect ratio, not the logo's.
    FrameFraction(f32),
    /// Resize to an exact size.
    Exact {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
}

impl Default for LogoScale {
    fn default() -> Self {
        LogoScale::Factor(0.5)
    }
}

impl LogoScale {
    /// Check that factors are finite and positive and exact sizes non-zero.
    ///
    /// # Errors
    ///
    /// [`WatermarkError::InvalidScale`] or [`WatermarkError::InvalidLogoSize`].
    pub fn validate(&self) -> Result<(), WatermarkError> {
        match *self {
            LogoScale::Original => Ok(()),
            LogoScale::Factor(factor) | LogoScale::FrameFraction(factor) => {
                if factor.is_finite() && factor > 0.0 {
                    Ok(())
                } else {
                    Err(WatermarkError::InvalidScale(factor))
                }
            }
            LogoScale::Exact { width, height } => {
                if width == 0 || height == 0 {
                    Err(WatermarkError::InvalidLogoSize { width, height })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Compute the on-frame logo size.
    ///
    /// Fractional sizes are truncated and clamped to at least one pixel.
    pub fn resolve(
        &self,
        logo_width: u32,
        logo_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> (u32, u32) {
        let scaled = |base: u32, factor: f32| ((base as f64 * factor as f64) as u32).max(1);
        match *self {
            LogoScale::Original => (logo_width, logo_height),
            LogoScale::Factor(factor) => (scaled(logo_width, factor), scaled(logo_height, factor)),
            LogoScale::FrameFraction(factor) => {
                (scaled(frame_width, factor), scaled(frame_height, factor))
            }
            LogoScale::Exact { width, height } => (width, height),
        }
    }
}

/// An RGBA logo bitmap.
#[derive(Debug, Clone)]
pub struct Logo {
    image: RgbaImage,
    path: Option<PathBuf>,
}

impl Logo {
    /// Load a logo from any format the `image` crate understands.
    ///
    /// # Errors
    ///
    /// [`WatermarkError::LogoLoad`] if the file cannot be read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|error| WatermarkError::LogoLoad {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?
            .to_rgba8();
        log::debug!(
            "Loaded logo {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            image,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory RGBA image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image, path: None }
    }

    /// Logo width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Logo height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Source path, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Borrow the RGBA pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Produce the logo at its on-frame size for a given frame size.
    ///
    /// # Errors
    ///
    /// Propagates [`LogoScale::validate`] failures.
    pub fn sized_for(
        &self,
        scale: LogoScale,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<RgbaImage, WatermarkError> {
        scale.validate()?;
        let (width, height) = scale.resolve(self.width(), self.height(), frame_width, frame_height);
        if (width, height) == (self.width(), self.height()) {
            return Ok(self.image.clone());
        }
        Ok(image::imageops::resize(
            &self.image,
            width,
            height,
            FilterType::CatmullRom,
        ))
    }
}
