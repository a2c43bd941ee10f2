//! Torso locator: find the rear boundary of the torso along the back
//! line.
//!
//! Right of the withers and inside the upper third of the box, the back
//! line descends and then curves up into the hindquarters. The walk
//! tracks edge slopes as a finite-state fold: once a non-zero slope is
//! followed by a non-positive one the torso has started; the next
//! positive slope marks the flip, and the vertex ending the last
//! descending edge is the torso's rear boundary.

use crate::types::{px, BoundingBox, Polygon};

/// Nudge applied to a zero horizontal delta before dividing.
const ZERO_DX_NUDGE: f64 = 1e-5;

/// Fold state for the slope-flip scan.
#[derive(Default)]
struct SlopeScan {
    /// Rounded slope of the previous qualifying edge.
    prev_tilt: f64,
    /// End vertex x of the previous qualifying edge.
    prev_x: i32,
    /// Whether a descending stretch has been entered.
    started: bool,
}

/// Locate the torso's rear boundary x.
///
/// Walks the closed polygon (including the wrap-around edge), gated to
/// edges starting right of `withers_x` and within the upper third of
/// the box. Returns 0 when no descending-then-ascending pattern exists;
/// callers treat the result as best-effort, matching the calibrated
/// behavior.
#[must_use]
pub fn locate(polygon: &Polygon, bbox: BoundingBox, withers_x: i32) -> i32 {
    let one_third_h = f64::from(bbox.y + bbox.height / 3);
    let withers_x = f64::from(withers_x);

    let vertices = polygon.vertices();
    let n = vertices.len();
    let mut scan = SlopeScan::default();

    for i in 0..n {
        let a = vertices[i];
        // Ring closure: the last edge wraps back to the first vertex.
        let b = vertices[(i + 1) % n];

        // Outside the rear-of-withers, upper-third window.
        if a.x < withers_x || a.y > one_third_h {
            continue;
        }

        let mut dx = b.x - a.x;
        if dx == 0.0 {
            dx += ZERO_DX_NUDGE;
        }
        let tilt = ((b.y - a.y) / dx * 10.0).round() / 10.0;

        if scan.started && tilt > 0.0 {
            return scan.prev_x;
        }

        if tilt <= 0.0 && scan.prev_tilt != 0.0 {
            scan.started = true;
        }

        scan.prev_tilt = tilt;
        scan.prev_x = px(b.x);
    }

    0
}

/// Torso length: horizontal span from the withers line to the torso's
/// rear boundary, in pixels.
///
/// When the scan degrades to 0 the raw span turns negative; the length
/// is clamped so the reported measurement stays non-negative.
#[must_use]
pub fn length(torso_x: i32, withers_x: i32) -> f64 {
    f64::from(torso_x - withers_x).max(0.0)
}
