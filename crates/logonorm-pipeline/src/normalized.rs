//! [`NormalizedImage`]: a mutable RGBA raster with lazily derived,
//! invalidation-tracked properties.
//!
//! Derived properties (contours, visual bounds, visual and foreground
//! percentages, color histograms) are expensive: each one walks every
//! pixel, and contour extraction runs Canny four times. They live in a
//! [`DerivedCache`] that is filled on first access and discarded as a
//! whole by every mutation, so a cached value is never older than the
//! raster it was computed from.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;

use image::{DynamicImage, GrayImage};

use crate::histogram::ColorCount;
use crate::types::{
    Color, Dimensions, NormalizeConfig, PipelineError, Polygon, Rect, ResizeFilter, RgbaImage,
    TRANSPARENT, TRANSPARENT_WHITE,
};

/// Per-channel distance within which a blurred pixel matches a
/// background color in [`NormalizedImage::strip_background`].
pub const STRIP_MARGIN: u8 = 10;

/// Derived values of the current raster.
///
/// All fields are invalidated together; there is no selective
/// invalidation.
#[derive(Debug, Default)]
struct DerivedCache {
    contours: OnceCell<Vec<Polygon>>,
    visual_bounds: OnceCell<Rect>,
    visual_percentage: OnceCell<f64>,
    foreground_percentage: OnceCell<f64>,
    color_histogram: OnceCell<Vec<ColorCount>>,
    background_color_histogram: OnceCell<Vec<ColorCount>>,
}

impl DerivedCache {
    fn invalidate_all(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.contours.get().is_none()
            && self.visual_bounds.get().is_none()
            && self.visual_percentage.get().is_none()
            && self.foreground_percentage.get().is_none()
            && self.color_histogram.get().is_none()
            && self.background_color_histogram.get().is_none()
    }
}

/// A logo raster being normalized.
///
/// Always RGBA. Mutations replace the raster and drop every cached
/// derived value; reads populate the cache when caching is enabled and
/// recompute on every access otherwise.
#[derive(Debug)]
pub struct NormalizedImage {
    raster: RgbaImage,
    caching: bool,
    resize_filter: ResizeFilter,
    cache: DerivedCache,
}

impl NormalizedImage {
    /// Wrap a decoded image using the default pixel budget and filter.
    ///
    /// Images without an alpha channel become fully opaque RGBA.
    #[must_use]
    pub fn new(image: DynamicImage, caching: bool) -> Self {
        Self::with_budget(
            image,
            caching,
            NormalizeConfig::DEFAULT_MAX_PIXELS,
            ResizeFilter::default(),
        )
    }

    /// Wrap a decoded image, taking caching, pixel budget, and resampling
    /// filter from `config`.
    #[must_use]
    pub fn from_config(image: DynamicImage, config: &NormalizeConfig) -> Self {
        Self::with_budget(image, config.caching, config.max_pixels, config.resize_filter)
    }

    /// Wrap a decoded image, downscaling it (aspect ratio preserved) if it
    /// has more than `max_pixels` pixels.
    #[must_use]
    pub fn with_budget(
        image: DynamicImage,
        caching: bool,
        max_pixels: u64,
        resize_filter: ResizeFilter,
    ) -> Self {
        let (raster, _) =
            crate::downsample::fit_pixel_budget(image.into_rgba8(), max_pixels, resize_filter);
        Self {
            raster,
            caching,
            resize_filter,
            cache: DerivedCache::default(),
        }
    }

    /// The current raster.
    #[must_use]
    pub const fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Consume the wrapper and return the raster.
    #[must_use]
    pub fn into_raster(self) -> RgbaImage {
        self.raster
    }

    /// Whether derived values are cached between mutations.
    #[must_use]
    pub const fn caching(&self) -> bool {
        self.caching
    }

    /// Current raster dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.raster.dimensions();
        Dimensions::new(width, height)
    }

    /// `(0, 0, width, height)` of the current raster.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::full(self.dimensions())
    }

    // -----------------------------------------------------------------------
    // Derived values
    // -----------------------------------------------------------------------

    /// Outermost contours of the visible content.
    #[must_use]
    pub fn contours(&self) -> Cow<'_, [Polygon]> {
        self.cached_list(&self.cache.contours, || {
            crate::contour::find_external_contours(&self.raster)
        })
    }

    /// Smallest rectangle enclosing every contour, or the full bounds when
    /// there are none. Always lies within [`bounds`](Self::bounds).
    #[must_use]
    pub fn visual_bounds(&self) -> Rect {
        self.cached_value(&self.cache.visual_bounds, || {
            let rect = crate::merge::merge(&self.contours())
                .and_then(|merged| crate::merge::bounding_rect(&merged))
                .unwrap_or_else(|| self.bounds());
            debug_assert!(rect.fits_within(self.dimensions()));
            rect
        })
    }

    /// Fraction of the image area covered by [`visual_bounds`](Self::visual_bounds).
    #[must_use]
    pub fn visual_percentage(&self) -> f64 {
        self.cached_value(&self.cache.visual_percentage, || {
            self.fraction_of_area(self.visual_bounds().area())
        })
    }

    /// Fraction of the image area covered by the filled contours.
    ///
    /// Never larger than [`visual_percentage`](Self::visual_percentage).
    /// An image without contours counts as entirely foreground.
    #[must_use]
    pub fn foreground_percentage(&self) -> f64 {
        self.cached_value(&self.cache.foreground_percentage, || {
            self.fraction_of_area(crate::mask::count_foreground(&self.foreground_mask()))
        })
    }

    /// Distinct colors of the whole raster, most frequent first.
    #[must_use]
    pub fn color_histogram(&self) -> Cow<'_, [ColorCount]> {
        self.cached_list(&self.cache.color_histogram, || {
            crate::histogram::color_histogram(&self.raster)
        })
    }

    /// Distinct colors outside the filled contours, most frequent first.
    ///
    /// Empty when the image has no contours, since then nothing can be
    /// told apart from the artwork.
    #[must_use]
    pub fn background_color_histogram(&self) -> Cow<'_, [ColorCount]> {
        self.cached_list(&self.cache.background_color_histogram, || {
            crate::histogram::masked_out_histogram(&self.raster, &self.foreground_mask())
        })
    }

    /// Background colors that never occur inside the silhouette, most
    /// frequent first.
    ///
    /// A color occurs inside the silhouette when its whole-image count is
    /// larger than its background count.
    #[must_use]
    pub fn strict_background_colors(&self) -> Vec<ColorCount> {
        let totals: HashMap<Color, u64> = self
            .color_histogram()
            .iter()
            .map(|c| (c.color, c.count))
            .collect();

        self.background_color_histogram()
            .iter()
            .filter(|bg| totals.get(&bg.color).is_none_or(|&total| total <= bg.count))
            .copied()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Replace the raster with the sub-image described by `rect`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutOfBounds`] if `rect` is empty or
    /// extends past the current raster; the image is left untouched.
    pub fn crop(&mut self, rect: Rect) -> Result<(), PipelineError> {
        let dimensions = self.dimensions();
        if !rect.fits_within(dimensions) {
            return Err(PipelineError::OutOfBounds {
                region: rect,
                dimensions,
            });
        }

        let cropped =
            image::imageops::crop_imm(&self.raster, rect.x, rect.y, rect.width, rect.height)
                .to_image();
        self.replace_raster(cropped);
        Ok(())
    }

    /// Crop to [`visual_bounds`](Self::visual_bounds).
    ///
    /// # Errors
    ///
    /// Propagates [`crop`](Self::crop) errors; visual bounds always fit,
    /// so this only fails on an empty raster.
    pub fn crop_to_visual(&mut self) -> Result<(), PipelineError> {
        self.crop(self.visual_bounds())
    }

    /// Replace every pixel whose blurred value is within `margin` of
    /// `target` (on all four channels) with `replacement`.
    ///
    /// Matching is done on a copy blurred with a `kernel_size` Gaussian so
    /// anti-aliased fringes of the target color match too; replacement is
    /// written into the unblurred raster.
    pub fn strip_color(&mut self, target: Color, replacement: Color, margin: u8, kernel_size: u32) {
        let blurred = crate::blur::blur_rgba(&self.raster, kernel_size);
        let mut raster = std::mem::take(&mut self.raster);

        for (pixel, probe) in raster.pixels_mut().zip(blurred.pixels()) {
            let matches = probe
                .0
                .iter()
                .zip(target)
                .all(|(&value, wanted)| value.abs_diff(wanted) <= margin);
            if matches {
                pixel.0 = replacement;
            }
        }

        self.replace_raster(raster);
    }

    /// Pad the raster with `fill` by the given number of pixels per side.
    pub fn extend(&mut self, left: u32, right: u32, top: u32, bottom: u32, fill: Color) {
        let (width, height) = self.raster.dimensions();
        let mut padded = RgbaImage::from_pixel(
            width + left + right,
            height + top + bottom,
            image::Rgba(fill),
        );
        image::imageops::replace(&mut padded, &self.raster, i64::from(left), i64::from(top));
        self.replace_raster(padded);
    }

    /// Resample the raster to exactly `target`, ignoring aspect ratio.
    pub fn resize(&mut self, target: Dimensions) {
        let resized = image::imageops::resize(
            &self.raster,
            target.width,
            target.height,
            self.resize_filter.to_image_filter(),
        );
        self.replace_raster(resized);
    }

    /// Strip background colors, most frequent first.
    ///
    /// The fill is `fill` if given, else the most frequent background
    /// color, else transparent. The colors to strip are
    /// [`strict_background_colors`](Self::strict_background_colors) when
    /// `strict`, otherwise the whole
    /// [`background_color_histogram`](Self::background_color_histogram),
    /// truncated to `limit` entries. The list is captured once before
    /// stripping starts. Returns how many colors were stripped.
    pub fn strip_background(&mut self, fill: Option<Color>, strict: bool, limit: Option<usize>) -> usize {
        let fill = fill.unwrap_or_else(|| self.most_frequent_background());

        let colors: Vec<Color> = if strict {
            self.strict_background_colors()
        } else {
            self.background_color_histogram().into_owned()
        }
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|c| c.color)
        .collect();

        for &color in &colors {
            self.strip_color(color, fill, STRIP_MARGIN, crate::blur::DEFAULT_KERNEL_SIZE);
        }
        colors.len()
    }

    /// Pad the shorter side so the raster becomes square.
    ///
    /// The padding is split between the two opposing sides, the smaller
    /// half first. `fill` defaults as in
    /// [`strip_background`](Self::strip_background).
    pub fn make_rectangular(&mut self, fill: Option<Color>) {
        let Dimensions { width, height } = self.dimensions();
        if width == height {
            return;
        }

        let fill = fill.unwrap_or_else(|| self.most_frequent_background());
        let side = width.max(height);
        let (dw, dh) = (side - width, side - height);
        self.extend(dw / 2, dw - dw / 2, dh / 2, dh - dh / 2, fill);
    }

    /// Grow a one-pixel transparent border until the visual content
    /// occupies at most `target` of the frame.
    ///
    /// Growth continues while the visual *or* the foreground percentage
    /// exceeds `target` in strict mode, and while *both* exceed it
    /// otherwise. `on_cycle` runs after every extension with the cycle
    /// count and read-only access to the image. Returns the number of
    /// cycles.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `target` is not a
    /// positive finite number, and [`PipelineError::NoContours`] if the
    /// image still has no detectable content after growing, since further
    /// growth could never change the percentages.
    pub fn morph_to_percentage(
        &mut self,
        target: f64,
        strict: bool,
        mut on_cycle: impl FnMut(usize, &Self),
    ) -> Result<usize, PipelineError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "target percentage must be greater than zero, got {target}"
            )));
        }

        let mut cycles = 0;
        while self.needs_growth(target, strict) {
            self.extend(1, 1, 1, 1, TRANSPARENT_WHITE);
            cycles += 1;
            if self.contours().is_empty() {
                return Err(PipelineError::NoContours);
            }
            on_cycle(cycles, self);
        }

        tracing::debug!(
            cycles,
            target,
            strict,
            dimensions = %self.dimensions(),
            "morphed to percentage"
        );
        Ok(cycles)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn needs_growth(&self, target: f64, strict: bool) -> bool {
        let visual_over = self.visual_percentage() > target;
        if strict {
            visual_over || self.foreground_percentage() > target
        } else {
            visual_over && self.foreground_percentage() > target
        }
    }

    fn most_frequent_background(&self) -> Color {
        self.background_color_histogram()
            .first()
            .map_or(TRANSPARENT, |c| c.color)
    }

    /// Filled contours, or an all-foreground mask when there are none.
    fn foreground_mask(&self) -> GrayImage {
        let contours = self.contours();
        let dimensions = self.dimensions();
        if contours.is_empty() {
            GrayImage::from_pixel(
                dimensions.width,
                dimensions.height,
                image::Luma([crate::mask::FOREGROUND]),
            )
        } else {
            crate::mask::fill_contours(dimensions, &contours)
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn fraction_of_area(&self, pixels: u64) -> f64 {
        let total = self.dimensions().area();
        if total == 0 {
            return 0.0;
        }
        pixels as f64 / total as f64
    }

    fn replace_raster(&mut self, raster: RgbaImage) {
        self.raster = raster;
        self.cache.invalidate_all();
    }

    fn cached_value<T: Copy>(&self, cell: &OnceCell<T>, compute: impl FnOnce() -> T) -> T {
        if self.caching {
            *cell.get_or_init(compute)
        } else {
            compute()
        }
    }

    fn cached_list<'a, T: Clone>(
        &'a self,
        cell: &'a OnceCell<Vec<T>>,
        compute: impl FnOnce() -> Vec<T>,
    ) -> Cow<'a, [T]> {
        if self.caching {
            Cow::Borrowed(cell.get_or_init(compute))
        } else {
            Cow::Owned(compute())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: Color = [220, 20, 20, 255];

    /// `size`x`size` transparent canvas with an opaque red square covering
    /// `lo..hi` on both axes.
    fn square_on_canvas(size: u32, lo: u32, hi: u32) -> NormalizedImage {
        from_fn(size, size, |x, y| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                RED
            } else {
                TRANSPARENT
            }
        })
    }

    fn from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> Color) -> NormalizedImage {
        let raster = RgbaImage::from_fn(w, h, |x, y| image::Rgba(f(x, y)));
        NormalizedImage::new(DynamicImage::ImageRgba8(raster), true)
    }

    // --- Construction ---

    #[test]
    fn rgb_input_becomes_opaque_rgba() {
        let rgb = image::RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3]));
        let img = NormalizedImage::new(DynamicImage::ImageRgb8(rgb), true);
        assert_eq!(img.dimensions(), Dimensions::new(4, 3));
        assert!(img.raster().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn oversized_input_is_downscaled() {
        let raster = RgbaImage::new(200, 100);
        let img = NormalizedImage::with_budget(
            DynamicImage::ImageRgba8(raster),
            true,
            5_000,
            ResizeFilter::Nearest,
        );
        assert_eq!(img.dimensions(), Dimensions::new(100, 50));
    }

    // --- Derived values ---

    #[test]
    fn visual_bounds_enclose_the_artwork() {
        let img = square_on_canvas(60, 20, 40);
        let vb = img.visual_bounds();
        assert!(vb.fits_within(img.dimensions()));
        assert!((17..=20).contains(&vb.x), "x = {}", vb.x);
        assert!((17..=20).contains(&vb.y), "y = {}", vb.y);
        assert!((40..=43).contains(&(vb.x + vb.width)), "right = {}", vb.x + vb.width);
        assert!((40..=43).contains(&(vb.y + vb.height)), "bottom = {}", vb.y + vb.height);
    }

    #[test]
    fn foreground_never_exceeds_visual() {
        // Two small squares in opposite corners: a large bounding box but
        // a small silhouette.
        let img = from_fn(60, 60, |x, y| {
            let a = (2..8).contains(&x) && (2..8).contains(&y);
            let b = (52..58).contains(&x) && (52..58).contains(&y);
            if a || b { RED } else { TRANSPARENT }
        });
        let (vp, fp) = (img.visual_percentage(), img.foreground_percentage());
        assert!(vp > 0.8, "vp = {vp}");
        assert!(fp < 0.1, "fp = {fp}");
        assert!(fp <= vp);
    }

    #[test]
    fn image_without_contours_is_all_foreground() {
        let img = from_fn(20, 10, |_, _| RED);
        assert!(img.contours().is_empty());
        assert_eq!(img.visual_bounds(), img.bounds());
        assert!((img.visual_percentage() - 1.0).abs() < f64::EPSILON);
        assert!((img.foreground_percentage() - 1.0).abs() < f64::EPSILON);
        assert!(img.background_color_histogram().is_empty());
    }

    #[test]
    fn strict_background_excludes_colors_inside_the_silhouette() {
        const WHITE: Color = [255, 255, 255, 255];
        const OFF_WHITE: Color = [250, 250, 250, 255];
        // White canvas with a faint off-white top row (too faint to form an
        // edge) and a red square with a white pixel in its middle.
        let img = from_fn(60, 60, |x, y| {
            if x == 30 && y == 30 {
                WHITE
            } else if (20..40).contains(&x) && (20..40).contains(&y) {
                RED
            } else if y == 0 {
                OFF_WHITE
            } else {
                WHITE
            }
        });

        let background: Vec<Color> = img.background_color_histogram().iter().map(|c| c.color).collect();
        assert!(background.contains(&WHITE));
        assert!(background.contains(&OFF_WHITE));

        let strict: Vec<Color> = img.strict_background_colors().iter().map(|c| c.color).collect();
        assert_eq!(strict, vec![OFF_WHITE]);
    }

    // --- Caching ---

    #[test]
    fn reads_populate_the_cache() {
        let img = square_on_canvas(40, 10, 30);
        assert!(img.cache.is_empty());
        let _ = img.foreground_percentage();
        assert!(img.cache.contours.get().is_some());
        assert!(img.cache.foreground_percentage.get().is_some());
    }

    #[test]
    fn cached_values_are_stable_between_mutations() {
        let img = square_on_canvas(40, 10, 30);
        let first = img.visual_bounds();
        let second = img.visual_bounds();
        assert_eq!(first, second);
        assert_eq!(img.cache.visual_bounds.get(), Some(&first));
    }

    #[test]
    fn extend_invalidates_everything() {
        let mut img = square_on_canvas(40, 10, 30);
        let vp = img.visual_percentage();
        let fp = img.foreground_percentage();
        let hist_len = img.color_histogram().len();
        let _ = img.background_color_histogram();

        img.extend(10, 10, 10, 10, TRANSPARENT_WHITE);
        assert!(img.cache.is_empty());
        assert!(img.visual_percentage() < vp);
        assert!(img.foreground_percentage() < fp);
        assert_eq!(img.color_histogram().len(), hist_len + 1);
    }

    #[test]
    fn crop_invalidates_everything() {
        let mut img = square_on_canvas(40, 10, 30);
        let vp = img.visual_percentage();
        img.crop(Rect::new(5, 5, 30, 30)).unwrap();
        assert!(img.cache.is_empty());
        assert!(img.visual_percentage() > vp);
    }

    #[test]
    fn strip_color_invalidates_everything() {
        let mut img = square_on_canvas(40, 10, 30);
        let hist = img.color_histogram().into_owned();
        assert!(!img.contours().is_empty());
        img.strip_color(RED, TRANSPARENT, 10, 3);
        assert!(img.cache.is_empty());
        assert_eq!(img.raster().get_pixel(20, 20).0, TRANSPARENT);
        // Only the ring the blur softened survives.
        assert_ne!(img.color_histogram().into_owned(), hist);
        let red = img.color_histogram().iter().find(|c| c.color == RED).map_or(0, |c| c.count);
        assert!(red < 20 * 20);
    }

    #[test]
    fn resize_invalidates_everything() {
        let mut img = square_on_canvas(40, 10, 30);
        let vb = img.visual_bounds();
        img.resize(Dimensions::new(80, 80));
        assert!(img.cache.is_empty());
        assert_ne!(img.visual_bounds(), vb);
    }

    #[test]
    fn disabled_caching_recomputes_identical_values() {
        let raster = RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                image::Rgba(RED)
            } else {
                image::Rgba(TRANSPARENT)
            }
        });
        let cached = NormalizedImage::new(DynamicImage::ImageRgba8(raster.clone()), true);
        let uncached = NormalizedImage::new(DynamicImage::ImageRgba8(raster), false);

        assert_eq!(cached.visual_bounds(), uncached.visual_bounds());
        assert!((cached.foreground_percentage() - uncached.foreground_percentage()).abs() < f64::EPSILON);
        assert_eq!(cached.color_histogram(), uncached.color_histogram());
        assert!(uncached.cache.is_empty());
    }

    // --- Mutations ---

    #[test]
    fn crop_out_of_bounds_is_rejected() {
        let mut img = square_on_canvas(40, 10, 30);
        let err = img.crop(Rect::new(30, 0, 20, 10)).unwrap_err();
        assert!(matches!(err, PipelineError::OutOfBounds { .. }));
        assert_eq!(img.dimensions(), Dimensions::new(40, 40));
    }

    #[test]
    fn crop_to_visual_trims_the_padding() {
        let mut img = square_on_canvas(60, 20, 40);
        img.crop_to_visual().unwrap();
        let Dimensions { width, height } = img.dimensions();
        assert!((19..=26).contains(&width), "width = {width}");
        assert!((19..=26).contains(&height), "height = {height}");
    }

    #[test]
    fn extend_grows_each_side() {
        let mut img = from_fn(5, 4, |_, _| RED);
        img.extend(1, 2, 3, 4, TRANSPARENT);
        assert_eq!(img.dimensions(), Dimensions::new(8, 11));
        assert_eq!(img.raster().get_pixel(0, 0).0, TRANSPARENT);
        assert_eq!(img.raster().get_pixel(1, 3).0, RED);
        assert_eq!(img.raster().get_pixel(5, 6).0, RED);
        assert_eq!(img.raster().get_pixel(6, 7).0, TRANSPARENT);
    }

    #[test]
    fn strip_color_replaces_matching_pixels_only() {
        const GRAY: Color = [200, 200, 200, 255];
        let mut img = from_fn(30, 30, |x, y| {
            if (10..20).contains(&x) && (10..20).contains(&y) {
                RED
            } else {
                GRAY
            }
        });
        img.strip_color(GRAY, TRANSPARENT, 10, 3);
        assert_eq!(img.raster().get_pixel(0, 0).0, TRANSPARENT);
        assert_eq!(img.raster().get_pixel(29, 29).0, TRANSPARENT);
        assert_eq!(img.raster().get_pixel(15, 15).0, RED);
    }

    #[test]
    fn strip_background_uses_the_snapshot_limit() {
        const GRAY: Color = [200, 200, 200, 255];
        const BLUE: Color = [20, 20, 220, 255];
        // Gray canvas, blue bottom band, red square: two background colors.
        let mut img = from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                RED
            } else if y >= 50 {
                BLUE
            } else {
                GRAY
            }
        });
        let stripped = img.strip_background(Some(TRANSPARENT), false, Some(1));
        assert_eq!(stripped, 1);
        assert_eq!(img.raster().get_pixel(0, 0).0, TRANSPARENT);
        assert_eq!(img.raster().get_pixel(30, 30).0, RED);
    }

    #[test]
    fn strip_background_without_contours_is_a_no_op() {
        let mut img = from_fn(10, 10, |_, _| RED);
        assert_eq!(img.strip_background(None, true, None), 0);
        assert!(img.raster().pixels().all(|p| p.0 == RED));
    }

    #[test]
    fn make_rectangular_leaves_squares_alone() {
        let mut img = from_fn(30, 30, |_, _| RED);
        img.make_rectangular(Some(TRANSPARENT));
        assert_eq!(img.dimensions(), Dimensions::new(30, 30));
    }

    #[test]
    fn make_rectangular_splits_padding() {
        let mut img = from_fn(30, 21, |_, _| RED);
        img.make_rectangular(Some(TRANSPARENT));
        assert_eq!(img.dimensions(), Dimensions::new(30, 30));
        // 9 rows of padding: 4 on top, 5 below.
        assert_eq!(img.raster().get_pixel(0, 3).0, TRANSPARENT);
        assert_eq!(img.raster().get_pixel(0, 4).0, RED);
        assert_eq!(img.raster().get_pixel(0, 24).0, RED);
        assert_eq!(img.raster().get_pixel(0, 25).0, TRANSPARENT);

        let mut tall = from_fn(10, 16, |_, _| RED);
        tall.make_rectangular(Some(TRANSPARENT));
        assert_eq!(tall.dimensions(), Dimensions::new(16, 16));
        assert_eq!(tall.raster().get_pixel(2, 0).0, TRANSPARENT);
        assert_eq!(tall.raster().get_pixel(3, 0).0, RED);
    }

    // --- Morphing ---

    #[test]
    fn growth_never_increases_the_percentages() {
        let mut img = square_on_canvas(40, 15, 25);
        let mut previous = (img.visual_percentage(), img.foreground_percentage());
        for _ in 0..10 {
            img.extend(1, 1, 1, 1, TRANSPARENT_WHITE);
            let current = (img.visual_percentage(), img.foreground_percentage());
            assert!(current.0 <= previous.0, "visual grew: {previous:?} -> {current:?}");
            assert!(current.1 <= previous.1, "foreground grew: {previous:?} -> {current:?}");
            previous = current;
        }
    }

    #[test]
    fn small_artwork_on_large_canvas_needs_no_growth() {
        let mut img = square_on_canvas(100, 45, 55);
        let cycles = img.morph_to_percentage(0.2, true, |_, _| {}).unwrap();
        assert!(cycles < 5);
        assert!(img.visual_percentage() <= 0.2);
        assert!(img.foreground_percentage() <= 0.2);
    }

    #[test]
    fn strict_morph_terminates_with_both_below_target() {
        let mut img = square_on_canvas(30, 5, 25);
        let mut seen = Vec::new();
        let cycles = img
            .morph_to_percentage(0.2, true, |n, image| {
                seen.push((n, image.visual_percentage()));
            })
            .unwrap();
        assert!(cycles > 0 && cycles < 60, "cycles = {cycles}");
        assert_eq!(seen.len(), cycles);
        assert_eq!(seen.last().map(|s| s.0), Some(cycles));
        assert!(img.visual_percentage() <= 0.2);
        assert!(img.foreground_percentage() <= 0.2);
        assert_eq!(img.dimensions(), Dimensions::new(30 + 2 * cycles as u32, 30 + 2 * cycles as u32));
    }

    #[test]
    fn non_strict_stops_when_either_metric_reaches_target() {
        let corners = || {
            from_fn(60, 60, |x, y| {
                let a = (2..8).contains(&x) && (2..8).contains(&y);
                let b = (52..58).contains(&x) && (52..58).contains(&y);
                if a || b { RED } else { TRANSPARENT }
            })
        };

        let mut lenient = corners();
        assert_eq!(lenient.morph_to_percentage(0.5, false, |_, _| {}).unwrap(), 0);

        let mut strict = corners();
        let cycles = strict.morph_to_percentage(0.5, true, |_, _| {}).unwrap();
        assert!(cycles > 0);
        assert!(strict.visual_percentage() <= 0.5);
        assert!(strict.foreground_percentage() <= 0.5);
    }

    #[test]
    fn full_frame_artwork_gains_contours_after_growth() {
        let mut img = from_fn(20, 20, |_, _| RED);
        let cycles = img.morph_to_percentage(0.5, true, |_, _| {}).unwrap();
        assert!(cycles > 0);
        assert!(img.visual_percentage() <= 0.5);
    }

    #[test]
    fn blank_image_cannot_be_morphed() {
        let mut img = from_fn(20, 20, |_, _| TRANSPARENT);
        assert!(matches!(
            img.morph_to_percentage(0.5, true, |_, _| {}),
            Err(PipelineError::NoContours)
        ));
    }

    #[test]
    fn non_positive_target_is_rejected() {
        let mut img = square_on_canvas(30, 5, 25);
        assert!(matches!(
            img.morph_to_percentage(0.0, true, |_, _| {}),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert_eq!(img.dimensions(), Dimensions::new(30, 30));
    }
}
