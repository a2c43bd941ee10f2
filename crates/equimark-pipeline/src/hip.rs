//! Hip locator: a multi-pass visual edge search over the rear of the
//! photograph.
//!
//! Unlike the polygon locators, this stage works on the raw (already
//! contour-cropped) photograph. The rear half of the bounding box is
//! cropped, then up to three line-thickening iterations are tried
//! against three contrast levels. Each pass: contrast stretch →
//! grayscale → Otsu silhouette trace → adaptive binarization →
//! straight line detection → rasterize lines onto a blank canvas →
//! thicken → erase the tail/back silhouette from the canvas → median
//! filter ×4 → track a vertical pixel run bottom-up. The first pass
//! producing a candidate ends the search; the rightmost candidate
//! wins.
//!
//! This is intentionally the most heuristic stage of the pipeline: a
//! best-effort edge search, not a closed-form geometric rule.

use image::Luma;
use imageproc::contours::{BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::hough::{LineDetectionOptions, detect_lines, draw_polar_lines_mut};

use crate::types::{BoundingBox, GrayImage, MeasureConfig, PipelineError, RgbaImage};

/// Block radius of the adaptive binarization (13-pixel block).
const ADAPTIVE_BLOCK_RADIUS: u32 = 6;

/// Offset applied to the local mean in the adaptive binarization.
const ADAPTIVE_DELTA: i32 = 20;

/// Median filter passes applied to the cleaned line canvas.
const MEDIAN_PASSES: usize = 4;

/// Columns at the right edge excluded from the run scan.
const RUN_MARGIN: u32 = 10;

/// A run must exceed this many rows to qualify as a hip edge.
const RUN_MIN_LENGTH: u32 = 10;

/// Maximum leftward drift per row for a run to continue.
const RUN_DRIFT: i64 = 5;

/// Leftward jumps beyond this are stray marks, skipped without reset.
const RUN_SKIP: i64 = 10;

/// A contour point within this distance of the rightmost bottom line
/// column attaches the erase walk.
const CONTOUR_ATTACH_DISTANCE: i64 = 10;

/// Hough non-maximum suppression radius.
const LINE_SUPPRESSION_RADIUS: u32 = 8;

/// Per-pass denoise and erase parameters, picked by image width.
struct PassParams {
    /// Median filter kernel size.
    ksize: u32,
    /// Erase stroke thickness for the tail/back contour.
    bold: i32,
}

impl PassParams {
    fn for_width(width: u32, config: &MeasureConfig) -> Self {
        if width < config.hip_small_image_width {
            Self { ksize: 3, bold: 15 }
        } else {
            Self { ksize: 5, bold: 20 }
        }
    }
}

/// Locate the hip silhouette edge, in full-image coordinates.
///
/// Operates at native crop scale throughout (no intermediate upscale),
/// so the returned x needs only the crop-origin offset.
///
/// # Errors
///
/// Returns [`PipelineError::NoHipCandidate`] when the crop is too small
/// to scan or every contrast/dilation combination comes up empty.
pub fn locate(
    photo: &RgbaImage,
    bbox: BoundingBox,
    torso_x: i32,
    config: &MeasureConfig,
) -> Result<i32, PipelineError> {
    let (crop, origin) = rear_crop(photo, bbox, torso_x).ok_or(PipelineError::NoHipCandidate)?;
    let params = PassParams::for_width(photo.width(), config);

    let mut candidates: Vec<u32> = Vec::new();
    for thicken in 1..=config.hip_max_dilations {
        for &alpha in &config.hip_contrast_levels {
            if let Some(x) = search_pass(&crop, alpha, thicken, &params) {
                candidates.push(x);
            }
        }
        // First iteration with any candidate ends the search.
        if !candidates.is_empty() {
            break;
        }
    }

    let hip = candidates
        .into_iter()
        .max()
        .ok_or(PipelineError::NoHipCandidate)?;
    Ok(i32::try_from(hip).unwrap_or(i32::MAX).saturating_add(origin))
}

/// Crop the rear half of the bounding box: `torso_x` to the right edge,
/// upper half by height. Returns the crop and its left origin in
/// full-image coordinates (the origin can sit right of a degenerate
/// `torso_x`, so candidates are offset by it rather than by `torso_x`).
/// `None` when the region degenerates.
fn rear_crop(photo: &RgbaImage, bbox: BoundingBox, torso_x: i32) -> Option<(RgbaImage, i32)> {
    let origin = torso_x.max(bbox.x).max(0);
    let x0 = u32::try_from(origin).ok()?;
    let y0 = u32::try_from(bbox.y.max(0)).ok()?;
    let right = u32::try_from(bbox.right().max(0)).ok()?.min(photo.width());
    let half_h = u32::try_from(bbox.height.max(0)).ok()? / 2;
    let bottom = (y0 + half_h).min(photo.height());

    if x0 >= right || y0 >= bottom {
        return None;
    }
    let (w, h) = (right - x0, bottom - y0);
    if w <= RUN_MARGIN || h < 4 {
        return None;
    }
    Some((image::imageops::crop_imm(photo, x0, y0, w, h).to_image(), origin))
}

/// One contrast/dilation combination of the hip search.
fn search_pass(crop: &RgbaImage, alpha: f64, thicken: u8, params: &PassParams) -> Option<u32> {
    let stretched = contrast_stretch(crop, alpha);
    let gray = image::imageops::grayscale(&stretched);

    // External silhouette of the rear region; the erase walk follows
    // this boundary rather than the adaptive edge map.
    let silhouette = rear_silhouette(&gray)?;

    let binary =
        imageproc::contrast::adaptive_threshold(&gray, ADAPTIVE_BLOCK_RADIUS, ADAPTIVE_DELTA);

    let (w, h) = binary.dimensions();
    let lines = detect_lines(
        &binary,
        LineDetectionOptions {
            vote_threshold: (h / 2).max(10),
            suppression_radius: LINE_SUPPRESSION_RADIUS,
        },
    );

    // Rasterize the detected lines onto a blank canvas, white on black.
    let mut canvas = GrayImage::new(w, h);
    draw_polar_lines_mut(&mut canvas, &lines, Luma([255]));

    // Thicken by the current iteration count.
    canvas = imageproc::morphology::dilate(&canvas, Norm::LInf, thicken);

    let edge_column = rightmost_bottom_column(&canvas);
    erase_rear_contour(&mut canvas, &silhouette, edge_column, params.bold);

    let radius = params.ksize / 2;
    for _ in 0..MEDIAN_PASSES {
        canvas = imageproc::filter::median_filter(&canvas, radius, radius);
    }

    run_scan(&canvas)
}

/// Saturating per-channel contrast stretch (`v * alpha`, capped at 255).
fn contrast_stretch(image: &RgbaImage, alpha: f64) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        image::Rgba(std::array::from_fn(|c| scale_abs(p[c], alpha)))
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_abs(v: u8, alpha: f64) -> u8 {
    (f64::from(v) * alpha).round().clamp(0.0, 255.0) as u8
}

/// External silhouette boundary of the rear crop.
///
/// The crop is Otsu-binarized and traced inside a one-pixel black
/// border: a subject that touches the crop edges (the usual case, since
/// the crop is cut from inside the bounding box) still produces an
/// enclosing boundary. Returns the first outer boundary in crop
/// coordinates, or `None` when nothing crosses the threshold.
fn rear_silhouette(gray: &GrayImage) -> Option<Vec<imageproc::point::Point<u32>>> {
    let level = imageproc::contrast::otsu_level(gray);
    let (w, h) = gray.dimensions();
    let mut padded = GrayImage::new(w + 2, h + 2);
    for (x, y, p) in gray.enumerate_pixels() {
        if p.0[0] > level {
            padded.put_pixel(x + 1, y + 1, Luma([255]));
        }
    }

    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(&padded);
    let outer = contours
        .into_iter()
        .find(|c| c.border_type == BorderType::Outer)?;
    Some(
        outer
            .points
            .into_iter()
            .map(|p| imageproc::point::Point::new(p.x.saturating_sub(1), p.y.saturating_sub(1)))
            .collect(),
    )
}

/// Rightmost lit column on the bottom row of the line canvas, or 0
/// when the row is dark.
fn rightmost_bottom_column(canvas: &GrayImage) -> u32 {
    let (w, h) = canvas.dimensions();
    (0..w)
        .rev()
        .find(|&x| canvas.get_pixel(x, h - 1).0[0] > 0)
        .unwrap_or(0)
}

/// Paint the tail/back portion of the silhouette black on the canvas.
///
/// The walk attaches at the first contour point within
/// [`CONTOUR_ATTACH_DISTANCE`] of `edge_column` and erases from there to
/// the end of the contour, stroke thickness `bold`. This removes the
/// silhouette's own boundary lines from the edge map so the run scan
/// tracks interior hip edges only.
#[allow(clippy::cast_precision_loss)]
fn erase_rear_contour(
    canvas: &mut GrayImage,
    contour: &[imageproc::point::Point<u32>],
    edge_column: u32,
    bold: i32,
) {
    let mut attached = false;
    let mut kept: Vec<(u32, u32)> = Vec::new();
    for p in contour {
        if i64::from(edge_column) - i64::from(p.x) < CONTOUR_ATTACH_DISTANCE {
            attached = true;
        }
        if attached {
            kept.push((p.x, p.y));
        }
    }

    let radius = (bold / 2).max(1);
    for pair in kept.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        draw_line_segment_mut(
            canvas,
            (a.0 as f32, a.1 as f32),
            (b.0 as f32, b.1 as f32),
            Luma([0]),
        );
        if let (Ok(ax), Ok(ay)) = (i32::try_from(a.0), i32::try_from(a.1)) {
            draw_filled_circle_mut(canvas, (ax, ay), radius, Luma([0]));
        }
    }
    if let Some(&(x, y)) = kept.last()
        && let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y))
    {
        draw_filled_circle_mut(canvas, (x, y), radius, Luma([0]));
    }
}

/// Track a near-vertical lit run bottom-up through the lower half of
/// the canvas.
///
/// One column is consumed per row: the leftmost lit pixel, except that
/// stray marks more than [`RUN_SKIP`] columns left of the current track
/// are skipped. The run continues while the track drifts left by less
/// than [`RUN_DRIFT`] per row and resets otherwise; the first run
/// longer than [`RUN_MIN_LENGTH`] rows yields its current column.
fn run_scan(canvas: &GrayImage) -> Option<u32> {
    let (w, h) = canvas.dimensions();
    if w <= RUN_MARGIN || h < 2 {
        return None;
    }

    let mut prev_x: Option<i64> = None;
    let mut length: u32 = 0;
    for y in (h / 2..h).rev() {
        for x in 0..(w - RUN_MARGIN) {
            if canvas.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            if let Some(p) = prev_x {
                let delta = p - i64::from(x);
                if (0..RUN_DRIFT).contains(&delta) {
                    length += 1;
                } else if delta > RUN_SKIP {
                    // Stray mark far left of the track: keep looking
                    // in this row.
                    continue;
                } else {
                    length = 0;
                }
            }
            prev_x = Some(i64::from(x));
            if length > RUN_MIN_LENGTH {
                return Some(x);
            }
            // Track one column per row.
            break;
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn contrast_stretch_saturates() {
        let image = RgbaImage::from_pixel(2, 2, image::Rgba([200, 60, 0, 255]));
        let stretched = contrast_stretch(&image, 1.5);
        let p = stretched.get_pixel(0, 0).0;
        assert_eq!(p[0], 255);
        assert_eq!(p[1], 90);
        assert_eq!(p[2], 0);
    }

    #[test]
    fn rightmost_bottom_column_finds_lit_pixel() {
        let mut canvas = GrayImage::new(30, 20);
        canvas.put_pixel(7, 19, Luma([255]));
        canvas.put_pixel(22, 19, Luma([255]));
        canvas.put_pixel(25, 10, Luma([255])); // not on the bottom row
        assert_eq!(rightmost_bottom_column(&canvas), 22);
    }

    #[test]
    fn rightmost_bottom_column_defaults_to_zero() {
        let canvas = GrayImage::new(30, 20);
        assert_eq!(rightmost_bottom_column(&canvas), 0);
    }

    #[test]
    fn run_scan_tracks_a_vertical_line() {
        let mut canvas = GrayImage::new(40, 40);
        for y in 10..40 {
            canvas.put_pixel(20, y, Luma([255]));
        }
        assert_eq!(run_scan(&canvas), Some(20));
    }

    #[test]
    fn run_scan_follows_leftward_drift() {
        // One pixel left per row is within the drift allowance.
        let mut canvas = GrayImage::new(60, 60);
        for (i, y) in (20..60).rev().enumerate() {
            let x = 40 - u32::try_from(i).unwrap() / 2;
            canvas.put_pixel(x, y, Luma([255]));
        }
        let result = run_scan(&canvas);
        assert!(result.is_some());
        assert!(result.unwrap() < 40);
    }

    #[test]
    fn run_scan_resets_on_rightward_jump() {
        // Alternating columns 6 apart never build a qualifying run.
        let mut canvas = GrayImage::new(40, 40);
        for y in 10..40 {
            let x = if y % 2 == 0 { 20 } else { 26 };
            canvas.put_pixel(x, y, Luma([255]));
        }
        assert_eq!(run_scan(&canvas), None);
    }

    #[test]
    fn run_scan_skips_stray_left_marks() {
        // A stray mark far left of the track must not reset the run.
        let mut canvas = GrayImage::new(40, 40);
        for y in 10..40 {
            canvas.put_pixel(25, y, Luma([255]));
            if y % 4 == 0 {
                canvas.put_pixel(2, y, Luma([255]));
            }
        }
        assert_eq!(run_scan(&canvas), Some(25));
    }

    #[test]
    fn run_scan_ignores_the_right_margin() {
        let mut canvas = GrayImage::new(40, 40);
        for y in 10..40 {
            canvas.put_pixel(35, y, Luma([255])); // inside the excluded margin
        }
        assert_eq!(run_scan(&canvas), None);
    }

    #[test]
    fn run_scan_empty_canvas() {
        assert_eq!(run_scan(&GrayImage::new(40, 40)), None);
    }

    #[test]
    fn erase_rear_contour_blacks_out_the_boundary() {
        let mut canvas = GrayImage::from_pixel(40, 40, Luma([255]));
        let contour: Vec<imageproc::point::Point<u32>> = (0..40)
            .map(|y| imageproc::point::Point::new(30_u32, y))
            .collect();
        erase_rear_contour(&mut canvas, &contour, 32, 10);
        // The boundary column and its neighborhood are erased.
        assert_eq!(canvas.get_pixel(30, 20).0[0], 0);
        assert_eq!(canvas.get_pixel(28, 20).0[0], 0);
        // Far from the stroke the canvas is untouched.
        assert_eq!(canvas.get_pixel(5, 20).0[0], 255);
    }

    #[test]
    fn erase_rear_contour_ignores_detached_contours() {
        let mut canvas = GrayImage::from_pixel(40, 40, Luma([255]));
        let contour: Vec<imageproc::point::Point<u32>> = (0..40)
            .map(|y| imageproc::point::Point::new(5_u32, y))
            .collect();
        // Edge column far right of every contour point: nothing erased.
        erase_rear_contour(&mut canvas, &contour, 35, 10);
        assert_eq!(canvas.get_pixel(5, 20).0[0], 255);
    }

    #[test]
    fn silhouette_traced_when_the_subject_fills_the_crop() {
        // Bright field split by one dark stripe: the white region
        // touches every crop edge, which the border padding must
        // survive.
        let gray = GrayImage::from_fn(40, 40, |x, _| {
            if (20..23).contains(&x) {
                Luma([30])
            } else {
                Luma([220])
            }
        });
        let boundary = rear_silhouette(&gray).unwrap();
        assert!(!boundary.is_empty());
        assert!(boundary.iter().all(|p| p.x < 40 && p.y < 40));
        // The first outer region is the left piece, hugging the crop
        // border on three sides.
        assert!(boundary.iter().any(|p| p.x == 0));
        assert!(boundary.iter().any(|p| p.y == 39));
    }

    #[test]
    fn all_dark_crop_has_no_silhouette() {
        assert!(rear_silhouette(&GrayImage::new(40, 40)).is_none());
    }

    #[test]
    fn rear_crop_origin_clamps_to_the_box() {
        // A degenerate torso boundary (0) left of the box must not
        // shift the crop origin out of image coordinates.
        let photo = RgbaImage::new(120, 100);
        let bbox = BoundingBox::new(30, 0, 80, 80);
        let (crop, origin) = rear_crop(&photo, bbox, 0).unwrap();
        assert_eq!(origin, 30);
        assert_eq!(crop.dimensions(), (80, 40));
    }

    #[test]
    fn rear_crop_origin_follows_the_torso_boundary() {
        let photo = RgbaImage::new(120, 100);
        let bbox = BoundingBox::new(30, 0, 80, 80);
        let (crop, origin) = rear_crop(&photo, bbox, 50).unwrap();
        assert_eq!(origin, 50);
        assert_eq!(crop.dimensions(), (60, 40));
    }

    #[test]
    fn bright_field_with_stripes_yields_a_candidate() {
        // Dark vertical stripes crossing a bright hindquarter region
        // give the line detector full-height features; the search must
        // produce a candidate offset into full-image coordinates.
        let photo = RgbaImage::from_fn(200, 100, |x, _| {
            if (100..103).contains(&x) || (110..113).contains(&x) {
                image::Rgba([30, 30, 30, 255])
            } else {
                image::Rgba([200, 200, 200, 255])
            }
        });
        let bbox = BoundingBox::new(0, 0, 200, 100);
        let hip = locate(&photo, bbox, 60, &MeasureConfig::default()).unwrap();
        assert!((60..=190).contains(&hip), "hip = {hip}");
    }

    #[test]
    fn degenerate_crop_yields_no_candidate() {
        let photo = RgbaImage::new(50, 50);
        let bbox = BoundingBox::new(0, 0, 40, 40);
        // Torso boundary at the box's right edge leaves nothing to crop.
        let result = locate(&photo, bbox, 40, &MeasureConfig::default());
        assert!(matches!(result, Err(PipelineError::NoHipCandidate)));
    }

    #[test]
    fn featureless_crop_yields_no_candidate() {
        // A uniform black crop has no contours at all.
        let photo = RgbaImage::new(100, 100);
        let bbox = BoundingBox::new(0, 0, 100, 100);
        let result = locate(&photo, bbox, 20, &MeasureConfig::default());
        assert!(matches!(result, Err(PipelineError::NoHipCandidate)));
    }
}
