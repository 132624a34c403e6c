//! The fixed normalization sequence.
//!
//! ```text
//! decode -> crop to visual -> strip background -> make square
//!        -> morph to percentage -> strip background -> resize -> encode
//! ```
//!
//! [`Normalizer`] owns a validated [`NormalizeConfig`] and drives a
//! [`NormalizedImage`] through the steps, announcing each one (and the
//! percentages as they change) to a [`ProgressSink`]. Any error aborts the
//! remaining steps; nothing is retried.

use std::fmt;

use image::ImageFormat;

use crate::normalized::NormalizedImage;
use crate::types::{NormalizeConfig, PipelineError};

/// One step of the normalization sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Decoding the input and applying the pixel budget.
    Loading,
    /// Cropping to the visual bounds.
    Cropping,
    /// Replacing background colors with the fill.
    StrippingBackground,
    /// Padding to a square.
    MakingRectangular,
    /// Growing the border until the target percentage is met.
    Morphing,
    /// Resampling to the output resolution.
    Resizing,
    /// Encoding the final raster.
    Writing,
}

impl Step {
    /// Human-readable description shown in progress output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Loading => "Loading image",
            Self::Cropping => "Cropping to visual content",
            Self::StrippingBackground => "Stripping background",
            Self::MakingRectangular => "Making rectangular",
            Self::Morphing => "Morphing to percentage",
            Self::Resizing => "Resizing to final resolution",
            Self::Writing => "Writing output",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Receiver of progress events from a [`Normalizer`].
///
/// `step` is called when a step starts; `metrics` after cropping, after
/// squaring, and after every morph cycle.
pub trait ProgressSink {
    /// A step is starting.
    fn step(&mut self, step: Step);

    /// The visual and foreground percentages changed.
    fn metrics(&mut self, visual: f64, foreground: f64);
}

/// A [`ProgressSink`] that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn step(&mut self, _step: Step) {}

    fn metrics(&mut self, _visual: f64, _foreground: f64) {}
}

/// Runs the normalization sequence with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    /// Create a normalizer after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// [`NormalizeConfig::validate`].
    pub fn new(config: NormalizeConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Decode `bytes` into a [`NormalizedImage`] using this configuration's
    /// caching flag, pixel budget, and resampling filter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] from [`crate::codec::decode`].
    pub fn load(
        &self,
        bytes: &[u8],
        sink: &mut impl ProgressSink,
    ) -> Result<NormalizedImage, PipelineError> {
        sink.step(Step::Loading);
        let decoded = crate::codec::decode(bytes)?;
        Ok(NormalizedImage::from_config(decoded, &self.config))
    }

    /// Run every in-memory step on `image`, leaving it at the configured
    /// output resolution.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoContours`] if the image has no content
    /// that morphing could frame, or [`PipelineError::OutOfBounds`] from
    /// cropping.
    pub fn run(
        &self,
        image: &mut NormalizedImage,
        sink: &mut impl ProgressSink,
    ) -> Result<(), PipelineError> {
        let config = &self.config;
        let fill = config.background.color();

        sink.step(Step::Cropping);
        image.crop_to_visual()?;
        report(image, sink);

        sink.step(Step::StrippingBackground);
        let stripped = image.strip_background(Some(fill), config.strict, config.color_limit);
        tracing::debug!(stripped, "stripped background colors before morphing");

        sink.step(Step::MakingRectangular);
        image.make_rectangular(Some(fill));
        report(image, sink);

        sink.step(Step::Morphing);
        let cycles = image.morph_to_percentage(config.target_percentage, config.strict, |_, img| {
            report(img, sink);
        })?;

        sink.step(Step::StrippingBackground);
        let stripped = image.strip_background(Some(fill), config.strict, config.color_limit);
        tracing::debug!(stripped, "stripped background colors after morphing");

        sink.step(Step::Resizing);
        image.resize(config.resolution);

        tracing::info!(
            cycles,
            resolution = %config.resolution,
            "normalized image"
        );
        Ok(())
    }

    /// Decode, normalize, and re-encode an image in `format`.
    ///
    /// # Errors
    ///
    /// Any error from [`load`](Self::load), [`run`](Self::run), or
    /// [`crate::codec::encode`].
    pub fn normalize_bytes(
        &self,
        bytes: &[u8],
        format: ImageFormat,
        sink: &mut impl ProgressSink,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut image = self.load(bytes, sink)?;
        self.run(&mut image, sink)?;
        sink.step(Step::Writing);
        crate::codec::encode(image.raster(), format)
    }
}

fn report(image: &NormalizedImage, sink: &mut impl ProgressSink) {
    sink.metrics(image.visual_percentage(), image.foreground_percentage());
}
