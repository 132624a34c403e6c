//! Color histograms: distinct colors with occurrence counts.

use std::collections::HashMap;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{Color, RgbaImage};

/// One distinct color and how many pixels carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCount {
    /// The RGBA color.
    pub color: Color,
    /// Number of pixels with exactly this color.
    pub count: u64,
}

/// Distinct colors of every pixel in `image`, most frequent first.
#[must_use]
pub fn color_histogram(image: &RgbaImage) -> Vec<ColorCount> {
    sorted(count_colors(image.pixels().map(|p| p.0)))
}

/// Distinct colors of the pixels where `mask` is zero, most frequent
/// first.
///
/// `mask` must have the same dimensions as `image`.
#[must_use]
pub fn masked_out_histogram(image: &RgbaImage, mask: &GrayImage) -> Vec<ColorCount> {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    sorted(count_colors(
        image
            .pixels()
            .zip(mask.pixels())
            .filter(|(_, m)| m.0[0] == 0)
            .map(|(p, _)| p.0),
    ))
}

fn count_colors(pixels: impl Iterator<Item = Color>) -> HashMap<Color, u64> {
    let mut counts = HashMap::new();
    for color in pixels {
        *counts.entry(color).or_insert(0) += 1;
    }
    counts
}

/// Sort by count descending; ties are broken by color so the order is
/// deterministic.
fn sorted(counts: HashMap<Color, u64>) -> Vec<ColorCount> {
    let mut entries: Vec<ColorCount> = counts
        .into_iter()
        .map(|(color, count)| ColorCount { color, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.color.cmp(&b.color)));
    entries
}
