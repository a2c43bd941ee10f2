//! Polygon simplification and the dominance test.
//!
//! The dense outline is reduced to a handful of vertices with the
//! Ramer-Douglas-Peucker algorithm, tolerance `0.005 * perimeter`.
//! Before simplifying, the outline's bounding box is sized against the
//! image: a single blurry or disconnected mask can fragment into several
//! small contours, and only a region comparable in size to the input
//! image is trusted as the horse. Rejected outlines yield an empty
//! polygon and the all-zero box.

use crate::types::{px, BoundingBox, Dimensions, MeasureConfig, Point, Polygon};

/// Simplify the dominant outline into the measurement polygon.
///
/// Returns the simplified closed polygon and the outline's bounding
/// box. When the outline fails the dominance test (its box does not
/// exceed `dominance_scale` of the image in both dimensions), the
/// polygon is empty and the box is [`BoundingBox::ZERO`] — noise
/// rejection, not an error at this layer.
#[must_use = "returns the simplified polygon and bounding box"]
pub fn dominant_polygon(
    outline: &Polygon,
    dims: Dimensions,
    config: &MeasureConfig,
) -> (Polygon, BoundingBox) {
    let vertices = outline.vertices();
    if vertices.is_empty() {
        return (Polygon::new(vec![]), BoundingBox::ZERO);
    }

    let bbox = bounding_box(vertices);
    let min_height = f64::from(dims.height) * config.dominance_scale;
    let min_width = f64::from(dims.width) * config.dominance_scale;
    if f64::from(bbox.height) <= min_height || f64::from(bbox.width) <= min_width {
        return (Polygon::new(vec![]), BoundingBox::ZERO);
    }

    let epsilon = config.simplify_epsilon_factor * perimeter(vertices);
    (Polygon::new(simplify_ring(vertices, epsilon)), bbox)
}

/// Arc length of the closed outline, including the wrap-around edge.
#[must_use]
pub fn perimeter(vertices: &[Point]) -> f64 {
    if vertices.len() < 2 {
        return 0.0;
    }
    let mut total: f64 = vertices
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum();
    // Closing edge back to the start.
    if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
        total += last.distance(*first);
    }
    total
}

/// Integer bounding box of the outline vertices.
fn bounding_box(vertices: &[Point]) -> BoundingBox {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in vertices {
        min_x = min_x.min(v.x);
        min_y = min_y.min(v.y);
        max_x = max_x.max(v.x);
        max_y = max_y.max(v.y);
    }
    let x = px(min_x.floor());
    let y = px(min_y.floor());
    BoundingBox::new(x, y, px(max_x.ceil()) - x + 1, px(max_y.ceil()) - y + 1)
}

/// Ramer-Douglas-Peucker on a closed ring.
///
/// An open-path RDP pins both endpoints, which is wrong for a ring
/// (vertex 0 is an arbitrary trace start). The ring is split at the
/// vertex farthest from vertex 0, each half is simplified as an open
/// path, and the second half carries the wrap-around edge back to
/// vertex 0 so the closing edge is simplified like any other.
#[must_use = "returns the simplified ring"]
pub fn simplify_ring(vertices: &[Point], epsilon: f64) -> Vec<Point> {
    let n = vertices.len();
    if n < 3 {
        return vertices.to_vec();
    }

    // Split point: farthest vertex from the trace start.
    let mut far = 0;
    let mut far_dist = 0.0;
    for (i, v) in vertices.iter().enumerate() {
        let d = vertices[0].distance_squared(*v);
        if d > far_dist {
            far_dist = d;
            far = i;
        }
    }
    if far == 0 {
        // All vertices coincide.
        return vec![vertices[0]];
    }

    let mut kept = vec![false; n];
    kept[0] = true;
    kept[far] = true;

    // First half: start..split.
    rdp_recurse(vertices, 0, far, epsilon, &mut kept);

    // Second half: split..end plus the wrap edge back to the start.
    let mut tail: Vec<Point> = vertices[far..].to_vec();
    tail.push(vertices[0]);
    let mut tail_kept = vec![false; tail.len()];
    rdp_recurse(&tail, 0, tail.len() - 1, epsilon, &mut tail_kept);
    for (i, flag) in tail_kept.iter().enumerate().take(tail.len() - 1) {
        if *flag {
            kept[far + i] = true;
        }
    }

    vertices
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&v, _)| v)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the vertex between `start` and `end` that is farthest from the
/// chord between them. If that distance exceeds `epsilon`, the vertex
/// is kept and both sub-chords are processed recursively.
fn rdp_recurse(vertices: &[Point], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(vertices[i], vertices[start], vertices[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(vertices, start, max_idx, epsilon, kept);
        rdp_recurse(vertices, max_idx, end, epsilon, kept);
    }
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
///
/// `|cross(b-a, p-a)| / |b-a|`; falls back to point distance when the
/// endpoints coincide.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
