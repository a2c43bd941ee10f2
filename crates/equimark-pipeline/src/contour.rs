//! Outline extraction: from the silhouette mask to ordered boundary
//! vertices.
//!
//! The mask's alpha channel is median-filtered to knock out speckle
//! noise from the segmentation network, then external boundaries are
//! traced with Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]). Holes and internal
//! contours are discarded: only the outer silhouette matters to the
//! landmark heuristics.

use imageproc::contours::{BorderType, Contour};

use crate::mask::SilhouetteMask;
use crate::types::{PipelineError, Point, Polygon};

/// Median filter kernel size applied to the mask before tracing.
///
/// Kernel 7 (radius 3) removes stray single-pixel mask responses
/// without eroding the silhouette boundary meaningfully.
const DENOISE_KERNEL: u32 = 7;

/// Extract the external outlines of the mask's foreground regions,
/// largest first.
///
/// Each outline is an ordered, closed walk of boundary pixels. Only the
/// first (largest) outline is used downstream, but all are returned for
/// diagnostics.
///
/// # Errors
///
/// Returns [`PipelineError::NoContourFound`] when the mask contains no
/// foreground boundary at all — this propagates to the caller rather
/// than defaulting, since every later stage needs an outline.
pub fn extract_outlines(mask: &SilhouetteMask) -> Result<Vec<Polygon>, PipelineError> {
    let gray = mask.alpha_channel();
    let radius = DENOISE_KERNEL / 2;
    let denoised = imageproc::filter::median_filter(&gray, radius, radius);

    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(&denoised);

    let mut outlines: Vec<Polygon> = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter(|c| c.points.len() >= 2)
        .map(|c| {
            let vertices = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Polygon::new(vertices)
        })
        .collect();

    if outlines.is_empty() {
        return Err(PipelineError::NoContourFound);
    }

    // Largest boundary first: the dominant region is what the
    // simplifier sizes against the image.
    outlines.sort_by(|a, b| b.len().cmp(&a.len()));
    Ok(outlines)
}
