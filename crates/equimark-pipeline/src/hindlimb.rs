//! Hindlimb locator: the hindquarter-top landmark and its span to the
//! hip edge.
//!
//! Vertices left of the last front toe are skipped; among the first
//! eight qualifying vertices, the one with minimum `y` is the top of
//! the hindquarters. The hindlimb length is the horizontal span from
//! the hip edge to that landmark, at native image scale (matching the
//! hip locator's scale convention).

use crate::types::{px, Landmark, Polygon};

/// Locate the hindquarter-top landmark.
///
/// Inspects at most `vertex_cap` vertices right of `last_toe_x`,
/// excluding the trailing wrap vertex, and returns the one with the
/// smallest `y`. Returns the origin landmark when no vertex qualifies,
/// matching the calibrated fallback.
#[must_use]
pub fn locate(polygon: &Polygon, last_toe_x: i32, vertex_cap: usize) -> Landmark {
    let vertices = polygon.vertices();
    let scanned = vertices.len().saturating_sub(1);

    let mut inspected = 0_usize;
    let mut best_x = 0_i32;
    let mut best_y = f64::INFINITY;

    for v in &vertices[..scanned] {
        // Front half of the silhouette.
        if v.x < f64::from(last_toe_x) {
            continue;
        }
        if inspected >= vertex_cap {
            break;
        }
        inspected += 1;
        if v.y < best_y {
            best_y = v.y;
            best_x = px(v.x);
        }
    }

    if best_y.is_finite() {
        Landmark::new(best_x, px(best_y))
    } else {
        Landmark::new(0, 0)
    }
}

/// Hindlimb length: horizontal span from the hip edge to the
/// hindquarter top, in pixels.
///
/// A degraded hip search can place the edge left of the landmark; the
/// span is clamped so the reported length is never negative.
#[must_use]
pub fn length(hip_x: i32, hindlimb: Landmark) -> f64 {
    f64::from(hip_x - hindlimb.x).max(0.0)
}
