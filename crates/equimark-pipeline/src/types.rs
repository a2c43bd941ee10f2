//! Shared types for the equimark measurement pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded photograph and mask without depending on `image` directly.
pub use image::RgbaImage;

/// Truncate a floating-point pixel coordinate toward zero.
///
/// Matches integer conversion semantics used throughout the landmark
/// heuristics (mean toe positions, vertex coordinates).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn px(v: f64) -> i32 {
    v as i32
}

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// An integer-grid landmark located on the silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

impl Landmark {
    /// Create a new landmark.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The landmark as a floating-point [`Point`].
    #[must_use]
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

/// An ordered, closed sequence of vertices walking the silhouette boundary.
///
/// Used both for the dense extracted outline and for the simplified
/// polygon. Insertion order encodes walking direction around the
/// silhouette and every locator relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from a vector of vertices.
    #[must_use]
    pub const fn new(vertices: Vec<Point>) -> Self {
        Self(vertices)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices in walking order.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vertex vector.
    #[must_use]
    pub fn into_vertices(self) -> Vec<Point> {
        self.0
    }

    /// The vertex with the smallest `y` (topmost point of the silhouette).
    ///
    /// Ties resolve to the earliest vertex in walking order.
    #[must_use]
    pub fn topmost(&self) -> Option<Point> {
        self.0
            .iter()
            .copied()
            .reduce(|best, v| if v.y < best.y { v } else { best })
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Axis-aligned bounding box of the dominant contour, in image pixels.
///
/// All four fields are zero when no contour passed the dominance test —
/// the degenerate value is noise rejection, not an error, and the
/// pipeline entry point converts it to
/// [`PipelineError::NoDominantRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl BoundingBox {
    /// The degenerate all-zero box.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `true` for the degenerate zero-area box.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the right edge.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// The withers probe line and its two intersections with the silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithersSpan {
    /// The x coordinate of the vertical probe line (mean of toe vertices).
    pub x: i32,
    /// Upper intersection of the probe line with the silhouette.
    pub upper: Landmark,
    /// Lower intersection of the probe line with the silhouette.
    pub lower: Landmark,
    /// Rightmost toe vertex x, consumed by the hindlimb locator.
    pub last_toe_x: i32,
}

impl WithersSpan {
    /// Vertical span between the two intersections, in pixels.
    #[must_use]
    pub fn length(&self) -> f64 {
        f64::from((self.lower.y - self.upper.y).abs())
    }
}

/// The four body-segment lengths, in pixels of the working image.
///
/// Lengths are never negative: spans that would invert under a
/// degraded landmark are clamped to zero by the stage that computes
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    /// Withers height: vertical span of the front-leg probe line.
    pub withers: f64,
    /// Torso length: withers line to the rear slope inversion.
    pub torso: f64,
    /// Neck length: topmost silhouette vertex to the upper withers point,
    /// rounded to one decimal place.
    pub neck: f64,
    /// Hindlimb length: horizontal span from hip edge to hindquarter top.
    pub hindlimb: f64,
}

/// Tuning constants for the measurement pipeline.
///
/// Defaults reproduce the values the heuristics were calibrated with;
/// they are exposed so hosts can recalibrate without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// A contour is accepted as the horse only if its bounding box
    /// exceeds this fraction of the image in both dimensions.
    pub dominance_scale: f64,

    /// Polygon simplification tolerance as a fraction of the outline
    /// perimeter (`epsilon = factor * perimeter`).
    pub simplify_epsilon_factor: f64,

    /// Toe line: vertices within this fraction of the box height above
    /// the bottom edge count as toe candidates.
    pub toe_line_fraction: f64,

    /// Withers early stop: the previous edge must have descended more
    /// steeply than this fraction of the box height.
    pub steep_rise_fraction: f64,

    /// Withers early stop: the current edge counts as flattened when its
    /// slope magnitude drops below this limit.
    pub flat_tilt_limit: f64,

    /// Contrast stretch factors tried by the hip search, in order.
    pub hip_contrast_levels: Vec<f64>,

    /// Maximum line-thickening dilation iterations in the hip search.
    pub hip_max_dilations: u8,

    /// Images narrower than this use the finer hip denoise kernel.
    pub hip_small_image_width: u32,

    /// Number of qualifying vertices the hindlimb scan inspects.
    pub hindlimb_vertex_cap: usize,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            dominance_scale: 0.6,
            simplify_epsilon_factor: 0.005,
            toe_line_fraction: 0.1,
            steep_rise_fraction: 2.0 / 7.0,
            flat_tilt_limit: 3.0,
            hip_contrast_levels: vec![1.5, 2.5, 4.5],
            hip_max_dilations: 3,
            hip_small_image_width: 150,
            hindlimb_vertex_cap: 8,
        }
    }
}

impl MeasureConfig {
    /// Check the configuration for values the heuristics cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.dominance_scale > 0.0 && self.dominance_scale <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "dominance_scale must be in (0, 1], got {}",
                self.dominance_scale
            )));
        }
        if self.simplify_epsilon_factor <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_epsilon_factor must be positive, got {}",
                self.simplify_epsilon_factor
            )));
        }
        if !(self.toe_line_fraction > 0.0 && self.toe_line_fraction < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "toe_line_fraction must be in (0, 1), got {}",
                self.toe_line_fraction
            )));
        }
        if self.hip_contrast_levels.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "hip_contrast_levels must not be empty".to_string(),
            ));
        }
        if self.hip_max_dilations == 0 {
            return Err(PipelineError::InvalidConfig(
                "hip_max_dilations must be at least 1".to_string(),
            ));
        }
        if self.hindlimb_vertex_cap == 0 {
            return Err(PipelineError::InvalidConfig(
                "hindlimb_vertex_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of running the pipeline with intermediate landmarks preserved.
///
/// Hosts use the intermediates to overlay diagnostics on the photograph;
/// tests use them to pin down individual stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedMeasurements {
    /// Simplified silhouette polygon.
    pub polygon: Polygon,
    /// Bounding box of the dominant contour.
    pub bounding_box: BoundingBox,
    /// Withers probe line and intersections.
    pub withers: WithersSpan,
    /// Torso rear boundary x.
    pub torso_x: i32,
    /// Hip silhouette edge x, in full-image coordinates.
    pub hip_x: i32,
    /// Hindquarter-top landmark.
    pub hindlimb: Landmark,
    /// The four derived lengths.
    pub measurements: Measurements,
}

/// Errors that can occur during measurement.
///
/// Every failure is unrecoverable for the current photograph: the
/// pipeline never substitutes defaults, because a silent zero would be
/// indistinguishable from a valid short measurement.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An input image had zero pixels.
    #[error("input image has zero pixels")]
    EmptyInput,

    /// Photograph and mask dimensions differ.
    #[error(
        "mask dimensions {}x{} do not match photograph {}x{}",
        mask.width, mask.height, photo.width, photo.height
    )]
    DimensionMismatch {
        /// Photograph dimensions.
        photo: Dimensions,
        /// Mask dimensions.
        mask: Dimensions,
    },

    /// Segmentation produced an empty or all-background mask.
    #[error("no contour found in the silhouette mask")]
    NoContourFound,

    /// A contour exists but is too small relative to the image to be
    /// the subject.
    #[error("no contour region dominates the image")]
    NoDominantRegion,

    /// The withers scan exhausted the polygon without a toe vertex.
    #[error("no toe vertices found below the lower line")]
    NoToesFound,

    /// Every contrast/dilation combination of the hip search came up empty.
    #[error("no hip edge candidate found")]
    NoHipCandidate,

    /// Pipeline configuration is invalid.
    #[error("invalid measure configuration: {0}")]
    InvalidConfig(String),
}
