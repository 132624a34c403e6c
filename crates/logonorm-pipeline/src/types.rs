//! Shared types for the logonorm normalization pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand rasters to the
/// pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// An RGBA color. Equality is exact per channel.
pub type Color = [u8; 4];

/// Fully transparent black, the fallback fill when nothing better is known.
pub const TRANSPARENT: Color = [0, 0, 0, 0];

/// Fully transparent white, the border fill used while morphing.
pub const TRANSPARENT_WHITE: Color = [255, 255, 255, 0];

/// An integer point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: u32,
    /// Vertical position (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of points forming a closed contour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polygon.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned pixel rectangle.
///
/// A rectangle belonging to a raster satisfies `x + width <= raster width`
/// and `y + height <= raster height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering an entire raster of the given dimensions.
    #[must_use]
    pub const fn full(dimensions: Dimensions) -> Self {
        Self::new(0, 0, dimensions.width, dimensions.height)
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether this rectangle is non-empty and lies entirely inside a
    /// raster of the given dimensions.
    #[must_use]
    pub const fn fits_within(self, dimensions: Dimensions) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= dimensions.width as u64
            && self.y as u64 + self.height as u64 <= dimensions.height as u64
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Fill color used when stripping background colors and when padding the
/// image to a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundFill {
    /// Fully transparent.
    #[default]
    Transparent,
    /// Opaque white.
    White,
    /// Opaque black.
    Black,
    /// An explicitly provided RGBA color.
    Color(Color),
}

impl BackgroundFill {
    /// The RGBA color this fill paints with.
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Transparent => TRANSPARENT,
            Self::White => [255, 255, 255, 255],
            Self::Black => [0, 0, 0, 255],
            Self::Color(c) => c,
        }
    }
}

impl fmt::Display for BackgroundFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str("transparent"),
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
            Self::Color([r, g, b, a]) => write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

impl FromStr for BackgroundFill {
    type Err = String;

    /// Parses `transparent`, `white`, `black`, `#RRGGBB` or `#RRGGBBAA`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transparent" => Ok(Self::Transparent),
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            other => {
                let hex = other
                    .strip_prefix('#')
                    .ok_or_else(|| format!("unknown background '{s}'"))?;
                if hex.len() != 6 && hex.len() != 8 {
                    return Err(format!("background color must be #RRGGBB or #RRGGBBAA, got '{s}'"));
                }
                let mut color = [0, 0, 0, 255];
                for (i, slot) in color.iter_mut().enumerate().take(hex.len() / 2) {
                    let byte = hex.get(i * 2..i * 2 + 2).unwrap_or_default();
                    *slot = u8::from_str_radix(byte, 16)
                        .map_err(|e| format!("invalid hex in background '{s}': {e}"))?;
                }
                Ok(Self::Color(color))
            }
        }
    }
}

/// Resampling filter used for the pixel-budget downscale and the final
/// resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    #[must_use]
    pub const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Configuration for the normalization pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Fraction of the final frame the visual content may occupy.
    /// Must be greater than zero.
    pub target_percentage: f64,

    /// Final output resolution.
    pub resolution: Dimensions,

    /// Strict mode: morphing continues until *both* the visual and the
    /// foreground percentage reach the target, and only colors that never
    /// occur inside the silhouette are stripped as background.
    pub strict: bool,

    /// Cache derived image properties between mutations.
    pub caching: bool,

    /// Maximum number of background colors stripped per pass.
    /// `None` strips every background color found.
    pub color_limit: Option<usize>,

    /// Fill for stripped background pixels and squaring padding.
    pub background: BackgroundFill,

    /// Resampling filter for downscaling and the final resize.
    pub resize_filter: ResizeFilter,

    /// Pixel budget for input rasters; larger inputs are downscaled on
    /// construction.
    pub max_pixels: u64,
}

impl NormalizeConfig {
    /// Default fraction of the frame occupied by the visual content.
    pub const DEFAULT_TARGET_PERCENTAGE: f64 = 0.2;

    /// Default output edge length (the output is square by default).
    pub const DEFAULT_RESOLUTION: u32 = 512;

    /// Default pixel budget: a quarter of a 1080p frame.
    pub const DEFAULT_MAX_PIXELS: u64 = 1920 * 1080 / 4;

    /// Check the configuration for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the target percentage is
    /// not a positive finite number, the resolution has a zero dimension,
    /// or the pixel budget is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.target_percentage.is_finite() || self.target_percentage <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "target percentage must be greater than zero, got {}",
                self.target_percentage
            )));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if self.max_pixels == 0 {
            return Err(PipelineError::InvalidConfig(
                "pixel budget must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_percentage: Self::DEFAULT_TARGET_PERCENTAGE,
            resolution: Dimensions::new(Self::DEFAULT_RESOLUTION, Self::DEFAULT_RESOLUTION),
            strict: true,
            caching: true,
            color_limit: None,
            background: BackgroundFill::default(),
            resize_filter: ResizeFilter::default(),
            max_pixels: Self::DEFAULT_MAX_PIXELS,
        }
    }
}

/// Errors that can occur during normalization.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// The requested output format is unknown or not compiled in.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// A region extends past the current raster.
    #[error("region {region} is outside the {dimensions} image")]
    OutOfBounds {
        /// The requested region.
        region: Rect,
        /// The raster dimensions at the time of the request.
        dimensions: Dimensions,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The image has no detectable content, so it cannot be framed.
    #[error("no contours found in the image")]
    NoContours,
}
