//! Watermarking configuration.
//!
//! [`WatermarkOptions`] is a builder that carries the overlay geometry,
//! encoder settings, and operational hooks (progress callback, cancellation
//! token) through [`Watermarker`](crate::Watermarker).
//!
//! # Example
//!
//! ```
//! use vidmark::{CancellationToken, LogoScale, Placement, Position, WatermarkOptions};
//!
//! let token = CancellationToken::new();
//! let options = WatermarkOptions::new()
//!     .with_scale(LogoScale::FrameFraction(0.05))
//!     .with_placement(Placement::new(Position::TopRight, 20))
//!     .with_opacity(0.8)
//!     .with_cancellation(token.clone())
//!     .with_batch_size(10);
//! assert!(options.validate().is_ok());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::{
    composite::validate_opacity,
    encode::EncoderOptions,
    error::WatermarkError,
    logo::LogoScale,
    placement::Placement,
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
};

/// Configuration for a watermarking run.
///
/// The defaults are: logo at half its own size, top-right corner with a
/// 20 pixel margin, full opacity, MPEG-4 output, no progress callback, no
/// cancellation, progress every frame.
#[derive(Clone)]
pub struct WatermarkOptions {
    pub(crate) scale: LogoScale,
    pub(crate) placement: Placement,
    pub(crate) opacity: f32,
    pub(crate) encoder: EncoderOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
}

impl Debug for WatermarkOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WatermarkOptions")
            .field("scale", &self.scale)
            .field("placement", &self.placement)
            .field("opacity", &self.opacity)
            .field("encoder", &self.encoder)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WatermarkOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            scale: LogoScale::default(),
            placement: Placement::default(),
            opacity: 1.0,
            encoder: EncoderOptions::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Set how the logo is sized.
    #[must_use]
    pub fn with_scale(mut self, scale: LogoScale) -> Self {
        self.scale = scale;
        self
    }

    /// Set where the logo is placed.
    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Set the logo opacity multiplier (`0.0..=1.0`).
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Set the output encoder settings.
    #[must_use]
    pub fn with_encoder(mut self, encoder: EncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the run stops before the next frame and
    /// returns [`WatermarkError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fire the progress callback every `size` frames. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Logo sizing.
    pub fn scale(&self) -> LogoScale {
        self.scale
    }

    /// Logo placement.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Logo opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Encoder settings.
    pub fn encoder(&self) -> &EncoderOptions {
        &self.encoder
    }

    /// Check scale and opacity before any file is touched.
    ///
    /// # Errors
    ///
    /// [`WatermarkError::InvalidScale`], [`WatermarkError::InvalidLogoSize`]
    /// or [`WatermarkError::InvalidOpacity`].
    pub fn validate(&self) -> Result<(), WatermarkError> {
        self.scale.validate()?;
        validate_opacity(self.opacity)?;
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::WatermarkOptions;
    use crate::{
        error::WatermarkError,
        logo::LogoScale,
        placement::Position,
        progress::CancellationToken,
    };

    #[test]
    fn defaults() {
        let options = WatermarkOptions::new();
        assert_eq!(options.scale(), LogoScale::Factor(0.5));
        assert_eq!(options.placement().position, Position::TopRight);
        assert_eq!(options.placement().margin, 20);
        assert_eq!(options.opacity(), 1.0);
        assert!(!options.is_cancelled());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn batch_size_clamped() {
        assert_eq!(WatermarkOptions::new().with_batch_size(0).batch_size, 1);
    }

    #[test]
    fn cancellation_is_observed() {
        let token = CancellationToken::new();
        let options = WatermarkOptions::new().with_cancellation(token.clone());
        token.cancel();
        assert!(options.is_cancelled());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(matches!(
            WatermarkOptions::new().with_opacity(2.0).validate(),
            Err(WatermarkError::InvalidOpacity(_))
        ));
        assert!(matches!(
            WatermarkOptions::new()
                .with_scale(LogoScale::Factor(-1.0))
                .validate(),
            Err(WatermarkError::InvalidScale(_))
        ));
    }
}
