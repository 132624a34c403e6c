//! logonorm-pipeline: logo normalization over in-memory rasters (sans-IO).
//!
//! Frames logo-style images uniformly:
//! crop to visual content -> strip background -> pad to square ->
//! grow a transparent border until the artwork covers a target fraction
//! of the frame -> strip background again -> resize.
//!
//! The central type is [`NormalizedImage`], a raster with lazily derived
//! properties (contours, visual bounds, coverage percentages, color
//! histograms) that every mutation invalidates together. [`Normalizer`]
//! runs the fixed step sequence and reports progress through
//! [`ProgressSink`].
//!
//! This crate has **no filesystem dependencies**: it works on encoded
//! byte slices and rasters. Reading and writing files lives in
//! `logonorm-batch`.

pub mod blur;
pub mod codec;
pub mod contour;
pub mod downsample;
pub mod histogram;
pub mod mask;
pub mod merge;
pub mod normalized;
pub mod pipeline;
pub mod types;

pub use histogram::ColorCount;
pub use image::ImageFormat;
pub use normalized::NormalizedImage;
pub use pipeline::{NoProgress, Normalizer, ProgressSink, Step};
pub use types::{
    BackgroundFill, Color, Dimensions, NormalizeConfig, PipelineError, Point, Polygon, Rect,
    ResizeFilter, RgbaImage, TRANSPARENT, TRANSPARENT_WHITE,
};
