//! Withers locator: find the front-leg column and measure the vertical
//! silhouette span through it.
//!
//! The polygon is walked edge by edge inside a front-leg search window
//! (lower two thirds of the box, right of the first quarter). Vertices
//! below the toe line are collected as toe candidates; the walk ends
//! early when a steep ascent is followed by a flattened edge, which
//! marks the top of a front leg. The withers probe line sits at the
//! mean toe x, and its intersections with the silhouette come from
//! alpha-probing the mask.

use crate::mask::SilhouetteMask;
use crate::types::{
    px, BoundingBox, Landmark, MeasureConfig, PipelineError, Polygon, WithersSpan,
};

/// Edge-walk state carried across the front-leg scan.
struct LegScan {
    /// Vertical delta of the previous edge.
    prev_dy: f64,
    /// Toe-candidate x coordinates.
    toes_x: Vec<f64>,
    /// Toe-candidate y coordinates.
    toes_y: Vec<f64>,
}

/// Locate the withers probe line and its silhouette intersections.
///
/// # Errors
///
/// Returns [`PipelineError::NoToesFound`] when the scan exhausts the
/// polygon without a single vertex below the toe line.
pub fn locate(
    polygon: &Polygon,
    bbox: BoundingBox,
    mask: &SilhouetteMask,
    config: &MeasureConfig,
) -> Result<WithersSpan, PipelineError> {
    let one_third_h = f64::from(bbox.y + bbox.height / 3);
    let quarter_w = f64::from(bbox.x + bbox.width / 4);
    let lower_line = f64::from(px(
        f64::from(bbox.bottom()) - f64::from(bbox.height) * config.toe_line_fraction,
    ));
    let steep_rise = -f64::from(bbox.height) * config.steep_rise_fraction;

    let mut scan = LegScan {
        prev_dy: 0.0,
        toes_x: Vec::new(),
        toes_y: Vec::new(),
    };

    // Open walk: the wrap-around edge never crosses the leg window.
    for pair in polygon.vertices().windows(2) {
        let (a, b) = (pair[0], pair[1]);

        // Outside the front-leg window.
        if (a.y < one_third_h && b.y < one_third_h) || a.x < quarter_w {
            continue;
        }

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let tilt = if dx == 0.0 { 0.0 } else { dy / dx };

        // A steep ascent that has just flattened is the top of a front
        // leg; everything beyond belongs to the belly and hindquarters.
        if scan.prev_dy < steep_rise && tilt.abs() < config.flat_tilt_limit {
            break;
        }

        if a.y > lower_line {
            scan.toes_x.push(a.x);
            scan.toes_y.push(a.y);
        }

        scan.prev_dy = dy;
    }

    if scan.toes_x.is_empty() {
        return Err(PipelineError::NoToesFound);
    }

    #[allow(clippy::cast_precision_loss)]
    let count = scan.toes_x.len() as f64;
    let wither_x = px(scan.toes_x.iter().sum::<f64>() / count);
    let last_toe_x = px(scan.toes_x.iter().fold(f64::NEG_INFINITY, |m, &x| m.max(x)));
    let toe_y = px(scan.toes_y.iter().sum::<f64>() / count);

    // Probe the mask's alpha along the vertical line. A probe that
    // misses the silhouette falls back to the box edges.
    let (upper_y, mut lower_y) = mask
        .column_span(wither_x, bbox.y, bbox.bottom())
        .unwrap_or((bbox.y, bbox.bottom() + 1));

    // Polygon simplification can pull the probed intersection above the
    // actual front-leg tip; clamp to the mean toe level.
    if lower_y < toe_y {
        lower_y = toe_y;
    }

    Ok(WithersSpan {
        x: wither_x,
        upper: Landmark::new(wither_x, upper_y),
        lower: Landmark::new(wither_x, lower_y),
        last_toe_x,
    })
}
