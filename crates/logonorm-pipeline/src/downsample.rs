//! Pixel-budget downscaling applied when an image is first wrapped.
//!
//! Contour extraction and masking are linear in the pixel count and run
//! once per morph cycle, so oversized inputs are shrunk (aspect ratio
//! preserved) until `width * height` fits the budget. Images already
//! within budget are returned unchanged.

use crate::types::{Dimensions, ResizeFilter, RgbaImage};

/// Dimensions an image of `dimensions` is scaled to so that it fits in
/// `max_pixels`, or `None` if it already fits.
///
/// The target is `floor(sqrt(max * w / h)) x floor(sqrt(max * h / w))`,
/// never smaller than 1x1.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn budget_dimensions(dimensions: Dimensions, max_pixels: u64) -> Option<Dimensions> {
    if dimensions.area() <= max_pixels || dimensions.width == 0 || dimensions.height == 0 {
        return None;
    }

    let max = max_pixels as f64;
    let (w, h) = (f64::from(dimensions.width), f64::from(dimensions.height));
    let width = (max * w / h).sqrt().floor().max(1.0) as u32;
    let height = (max * h / w).sqrt().floor().max(1.0) as u32;
    Some(Dimensions::new(width, height))
}

/// Downscale `image` to fit `max_pixels`.
///
/// Returns the (possibly unchanged) image and whether downscaling was
/// actually applied.
#[must_use]
pub fn fit_pixel_budget(
    image: RgbaImage,
    max_pixels: u64,
    filter: ResizeFilter,
) -> (RgbaImage, bool) {
    let (width, height) = image.dimensions();
    let Some(target) = budget_dimensions(Dimensions::new(width, height), max_pixels) else {
        return (image, false);
    };

    tracing::debug!(
        from = %Dimensions::new(width, height),
        to = %target,
        max_pixels,
        "downscaling input to pixel budget"
    );
    let resized = image::imageops::resize(
        &image,
        target.width,
        target.height,
        filter.to_image_filter(),
    );
    (resized, true)
}
