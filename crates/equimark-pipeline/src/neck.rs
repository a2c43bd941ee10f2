//! Neck locator: topmost silhouette vertex to the upper withers point.
//!
//! The topmost polygon vertex is the head or an ear in a side profile;
//! the neck is measured as the straight-line distance from there to the
//! upper withers intersection.

use crate::types::{Landmark, Polygon};

/// Neck length in pixels, rounded to one decimal place.
///
/// Returns 0.0 for an empty polygon; the pipeline never passes one
/// (simplification rejects empty rings earlier).
#[must_use]
pub fn length(polygon: &Polygon, withers_upper: Landmark) -> f64 {
    polygon.topmost().map_or(0.0, |start| {
        let d = start.distance(withers_upper.to_point());
        (d * 10.0).round() / 10.0
    })
}
