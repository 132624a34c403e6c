//! Contour extraction: find the outlines of the visible artwork.
//!
//! Edges are detected on the alpha-premultiplied raster so that every
//! fully transparent pixel looks the same, whatever RGB value it carries.
//! Each premultiplied channel goes through Canny, the edge maps are
//! OR-combined, and only the outermost borders are kept: holes and
//! nested outlines add nothing to the visual extent of a logo.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::types::{Point, Polygon, RgbaImage};

/// Canny low threshold used for contour detection.
pub const CANNY_LOW: f32 = 100.0;

/// Canny high threshold used for contour detection.
pub const CANNY_HIGH: f32 = 200.0;

/// Find the outermost contours of the visible content of `image`.
///
/// Returns an empty vector when the image has no edges at all (for
/// example a single flat color, or a fully transparent canvas).
#[must_use]
pub fn find_external_contours(image: &RgbaImage) -> Vec<Polygon> {
    let edges = edge_map(image);

    imageproc::contours::find_contours::<u32>(&edges)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(|c| {
            Polygon::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x, p.y))
                    .collect(),
            )
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Combined binary edge map of the premultiplied RGBA channels.
///
/// 255 marks an edge pixel in any channel, 0 everything else.
#[must_use = "returns the binary edge map"]
pub fn edge_map(image: &RgbaImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let premultiplied_image =
        RgbaImage::from_fn(w, h, |x, y| image::Rgba(premultiplied(image.get_pixel(x, y).0)));
    let mut combined = GrayImage::new(w, h);

    for c in 0..4 {
        let plane = GrayImage::from_fn(w, h, |x, y| {
            image::Luma([premultiplied_image.get_pixel(x, y).0[c]])
        });
        let edges = imageproc::edges::canny(&plane, CANNY_LOW, CANNY_HIGH);
        for (out, edge) in combined.pixels_mut().zip(edges.pixels()) {
            out.0[0] |= edge.0[0];
        }
    }

    combined
}

/// Premultiply the color channels by alpha.
#[allow(clippy::cast_possible_truncation)]
fn premultiplied([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let scale = |v: u8| ((u16::from(v) * u16::from(a) + 127) / 255) as u8;
    [scale(r), scale(g), scale(b), a]
}
