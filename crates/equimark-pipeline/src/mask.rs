//! Silhouette mask: alpha-channel foreground raster produced by the
//! external segmentation collaborator.
//!
//! A pixel belongs to the horse exactly when its alpha value is 255.
//! The mask is immutable once constructed; locators only read it, via
//! [`SilhouetteMask::is_foreground`] and the vertical probe
//! [`SilhouetteMask::column_span`].

use crate::types::{Dimensions, GrayImage, PipelineError, RgbaImage};

/// Alpha value marking a foreground (horse) pixel.
pub const FOREGROUND_ALPHA: u8 = 255;

/// A binary foreground mask over the photograph.
#[derive(Debug, Clone)]
pub struct SilhouetteMask {
    image: RgbaImage,
}

impl SilhouetteMask {
    /// Wrap a segmentation output raster.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if either dimension is zero.
    pub fn new(image: RgbaImage) -> Result<Self, PipelineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Self { image })
    }

    /// Mask dimensions in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the pixel at `(x, y)` is part of the silhouette.
    ///
    /// Coordinates outside the raster are background.
    #[must_use]
    pub fn is_foreground(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x.unsigned_abs(), y.unsigned_abs());
        if x >= self.image.width() || y >= self.image.height() {
            return false;
        }
        self.image.get_pixel(x, y).0[3] == FOREGROUND_ALPHA
    }

    /// The alpha channel as a single-channel image.
    ///
    /// Foreground pixels come out white (255), everything else keeps its
    /// (non-foreground) alpha, so contour extraction sees the same
    /// foreground set as [`is_foreground`](Self::is_foreground).
    #[must_use]
    pub fn alpha_channel(&self) -> GrayImage {
        GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            image::Luma([self.image.get_pixel(x, y).0[3]])
        })
    }

    /// Probe the vertical line at column `x` between `top` (inclusive)
    /// and `bottom` (exclusive).
    ///
    /// Returns the first foreground row from the top and one past the
    /// last foreground row from the bottom, or `None` when the column
    /// never crosses the silhouette. The +1 on the lower intersection
    /// matches the calibrated probe.
    #[must_use]
    pub fn column_span(&self, x: i32, top: i32, bottom: i32) -> Option<(i32, i32)> {
        let mut upper = None;
        let mut lower = None;
        for y in top..bottom {
            if self.is_foreground(x, y) {
                if upper.is_none() {
                    upper = Some(y);
                }
                lower = Some(y + 1);
            }
        }
        match (upper, lower) {
            (Some(u), Some(l)) => Some((u, l)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Mask with a filled foreground rectangle spanning `x0..x1`, `y0..y1`.
    fn rect_mask(w: u32, h: u32, x0: u32, x1: u32, y0: u32, y1: u32) -> SilhouetteMask {
        let image = RgbaImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 0])
            }
        });
        SilhouetteMask::new(image).unwrap()
    }

    #[test]
    fn zero_sized_mask_is_rejected() {
        let result = SilhouetteMask::new(RgbaImage::new(0, 10));
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn foreground_requires_full_alpha() {
        let mut image = RgbaImage::new(4, 4);
        image.put_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        image.put_pixel(2, 2, image::Rgba([0, 0, 0, 254]));
        let mask = SilhouetteMask::new(image).unwrap();
        assert!(mask.is_foreground(1, 1));
        assert!(!mask.is_foreground(2, 2));
    }

    #[test]
    fn out_of_bounds_is_background() {
        let mask = rect_mask(8, 8, 0, 8, 0, 8);
        assert!(!mask.is_foreground(-1, 0));
        assert!(!mask.is_foreground(0, -1));
        assert!(!mask.is_foreground(8, 0));
        assert!(!mask.is_foreground(0, 8));
    }

    #[test]
    fn alpha_channel_mirrors_foreground() {
        let mask = rect_mask(6, 6, 2, 4, 1, 5);
        let gray = mask.alpha_channel();
        assert_eq!(gray.get_pixel(2, 1).0[0], 255);
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn column_span_finds_both_intersections() {
        let mask = rect_mask(10, 20, 0, 10, 5, 15);
        // Foreground rows 5..15; lower carries the +1 offset.
        assert_eq!(mask.column_span(4, 0, 20), Some((5, 15)));
    }

    #[test]
    fn column_span_respects_probe_window() {
        let mask = rect_mask(10, 20, 0, 10, 5, 15);
        assert_eq!(mask.column_span(4, 8, 12), Some((8, 12)));
    }

    #[test]
    fn column_span_misses_background_column() {
        let mask = rect_mask(10, 20, 3, 7, 5, 15);
        assert_eq!(mask.column_span(1, 0, 20), None);
    }
}
