//! Gaussian blur used to tolerate anti-aliasing noise when matching
//! background colors.
//!
//! Blurring is expressed as an odd kernel size; [`kernel_sigma`] derives
//! the Gaussian sigma for it and [`blur_rgba`] applies that blur to each
//! RGBA channel independently.

use image::GrayImage;

use crate::types::RgbaImage;

/// Default kernel size used by [`NormalizedImage::strip_color`](crate::NormalizedImage::strip_color).
pub const DEFAULT_KERNEL_SIZE: u32 = 3;

/// Sigma for a Gaussian kernel of the given (odd) size.
///
/// Follows the common convention `0.3 * ((k - 1) * 0.5 - 1) + 0.8`, which
/// gives 0.8 for a 3x3 kernel. Kernel sizes of 0 or 1 mean "no blur" and
/// return 0.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    if kernel_size <= 1 {
        return 0.0;
    }
    let k = kernel_size as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Blur an RGBA image with a Gaussian of the given kernel size.
///
/// `imageproc::filter::gaussian_blur_f32` is applied to each channel
/// separately and the results are reassembled; a kernel size of 0 or 1
/// returns the image unchanged.
#[must_use = "returns the blurred RGBA image"]
pub fn blur_rgba(image: &RgbaImage, kernel_size: u32) -> RgbaImage {
    let sigma = kernel_sigma(kernel_size);
    if sigma <= 0.0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        let plane = GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]));
        imageproc::filter::gaussian_blur_f32(&plane, sigma)
    });

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba(std::array::from_fn(|c| channels[c].get_pixel(x, y).0[0]))
    })
}
