//! Encoded bytes in, encoded bytes out.
//!
//! The pipeline itself only sees rasters; this module is the boundary
//! with the `image` crate's codecs.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::types::{PipelineError, RgbaImage};

/// Decode raw image bytes (any format the `image` features enable).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    image::load_from_memory(bytes).map_err(PipelineError::ImageDecode)
}

/// Resolve an output format from a file extension such as `png` or `jpg`.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedFormat`] if the extension is
/// unknown or its encoder is not compiled in.
pub fn format_from_extension(extension: &str) -> Result<ImageFormat, PipelineError> {
    ImageFormat::from_extension(extension)
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| PipelineError::UnsupportedFormat(extension.to_string()))
}

/// Encode `raster` in `format`.
///
/// Formats without an alpha channel (JPEG) receive the RGB channels only.
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the encoder rejects the image.
pub fn encode(raster: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());
    let result = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgba8(raster.clone())
            .to_rgb8()
            .write_to(&mut buf, format)
    } else {
        raster.write_to(&mut buf, format)
    };
    result.map_err(PipelineError::ImageEncode)?;
    Ok(buf.into_inner())
}
