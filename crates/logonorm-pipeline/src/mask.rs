//! Foreground mask: the filled silhouette of a set of contours.
//!
//! Every contour is filled (interior plus outline) onto a single-channel
//! mask. Pixels set to 255 are foreground, 0 is presumed background.

use image::GrayImage;

use crate::types::{Dimensions, Point, Polygon};

/// Value of a foreground pixel in the mask.
pub const FOREGROUND: u8 = 255;

/// Fill every contour onto a mask of the given dimensions.
///
/// An empty contour set produces an all-background mask; callers that
/// need a different meaning for "no contours" handle it themselves.
#[must_use = "returns the filled mask"]
pub fn fill_contours(dimensions: Dimensions, contours: &[Polygon]) -> GrayImage {
    let mut mask = GrayImage::new(dimensions.width, dimensions.height);
    for contour in contours {
        fill_polygon(&mut mask, contour);
    }
    mask
}

/// Number of foreground pixels in `mask`.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}

/// Even-odd scanline fill followed by the outline itself.
///
/// Scanline crossings use the half-open rule (an edge counts on rows
/// `min_y..max_y`), which always pairs up; the outline pass then covers
/// the rows and pixels the half-open rule leaves out.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn fill_polygon(mask: &mut GrayImage, contour: &Polygon) {
    let points = contour.points();
    let Some(&first) = points.first() else {
        return;
    };
    let color = image::Luma([FOREGROUND]);

    if points.len() == 1 {
        if first.x < mask.width() && first.y < mask.height() {
            mask.put_pixel(first.x, first.y, color);
        }
        return;
    }

    let edges: Vec<(Point, Point)> = points
        .iter()
        .copied()
        .zip(points.iter().copied().cycle().skip(1))
        .collect();
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points
        .iter()
        .map(|p| p.y)
        .max()
        .unwrap_or(0)
        .min(mask.height().saturating_sub(1));

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        for &(a, b) in &edges {
            if (a.y > y) != (b.y > y) {
                let t = (f64::from(y) - f64::from(a.y)) / (f64::from(b.y) - f64::from(a.y));
                crossings.push(f64::from(b.x).mul_add(t, f64::from(a.x) * (1.0 - t)));
            }
        }
        crossings.sort_by(f64::total_cmp);
        for span in crossings.chunks_exact(2) {
            let from = span[0].ceil().max(0.0) as u32;
            let to = (span[1].floor() as u32).min(mask.width().saturating_sub(1));
            for x in from..=to {
                mask.put_pixel(x, y, color);
            }
        }
    }

    for &(a, b) in &edges {
        imageproc::drawing::draw_line_segment_mut(
            mask,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        );
    }
}
