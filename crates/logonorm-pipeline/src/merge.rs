//! Geometry merge: collapse many contours into one enclosing rectangle.
//!
//! [`merge`] scans every point of every contour once, tracking running
//! minima and maxima, and returns the enclosing rectangle as a 4-point
//! polygon. [`bounding_rect`] turns any polygon into the pixel
//! rectangle that covers it.

use crate::types::{Point, Polygon, Rect};

/// Merge a set of contours into their minimal axis-aligned enclosing
/// rectangle.
///
/// The result is a 4-point polygon in clockwise order: top-left,
/// top-right, bottom-right, bottom-left. Returns `None` when there are no
/// points at all; callers decide what an empty contour set means.
#[must_use]
pub fn merge(contours: &[Polygon]) -> Option<Polygon> {
    let mut points = contours.iter().flat_map(Polygon::points);
    let first = points.next()?;

    let (min_x, min_y, max_x, max_y) = points.fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );

    Some(Polygon::new(vec![
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ]))
}

/// The smallest pixel rectangle covering every point of `polygon`.
///
/// Points are pixel coordinates, so both extreme pixels are included:
/// a polygon spanning x = 2..=5 yields a rectangle of width 4. Returns
/// `None` for an empty polygon.
#[must_use]
pub fn bounding_rect(polygon: &Polygon) -> Option<Rect> {
    let merged = merge(std::slice::from_ref(polygon))?;
    let corners = merged.points();
    let (top_left, bottom_right) = (corners[0], corners[2]);
    Some(Rect::new(
        top_left.x,
        top_left.y,
        bottom_right.x - top_left.x + 1,
        bottom_right.y - top_left.y + 1,
    ))
}
