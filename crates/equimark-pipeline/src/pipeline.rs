//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::measure`] which runs the entire chain in one call,
//! [`Pending`] lets the caller drive execution one locator at a time:
//!
//! ```rust
//! # use equimark_pipeline::pipeline::Pending;
//! # use equimark_pipeline::{MeasureConfig, PipelineError, SilhouetteMask};
//! # use image::RgbaImage;
//! # fn run(photo: RgbaImage, mask: SilhouetteMask) -> Result<(), PipelineError> {
//! let staged = Pending::new(photo, mask, MeasureConfig::default())
//!     .extract()?
//!     .simplify()?
//!     .locate_withers()?
//!     .locate_torso()
//!     .locate_hip()?
//!     .locate_hindlimb()
//!     .into_staged();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state (or `Result` for fallible stages). Raster inputs are dropped
//! as soon as no later stage needs them: the mask is released after the
//! withers probe, the photograph after the hip search.

use crate::mask::SilhouetteMask;
use crate::types::{
    BoundingBox, Landmark, MeasureConfig, Measurements, PipelineError, Polygon, RgbaImage,
    StagedMeasurements, WithersSpan,
};
use crate::{contour, hindlimb, hip, neck, simplify, torso, withers};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing — call .extract() to continue"]
pub struct Pending {
    photo: RgbaImage,
    mask: SilhouetteMask,
    config: MeasureConfig,
}

impl Pending {
    /// Stage the photograph, its silhouette mask, and the configuration.
    pub const fn new(photo: RgbaImage, mask: SilhouetteMask, config: MeasureConfig) -> Self {
        Self {
            photo,
            mask,
            config,
        }
    }

    /// Validate inputs and extract the silhouette outlines.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an unusable
    /// configuration, [`PipelineError::EmptyInput`] /
    /// [`PipelineError::DimensionMismatch`] for unusable rasters, and
    /// [`PipelineError::NoContourFound`] when the mask has no
    /// foreground boundary.
    pub fn extract(self) -> Result<Outlined, PipelineError> {
        self.config.validate()?;
        if self.photo.width() == 0 || self.photo.height() == 0 {
            return Err(PipelineError::EmptyInput);
        }
        let photo_dims = crate::types::Dimensions {
            width: self.photo.width(),
            height: self.photo.height(),
        };
        if photo_dims != self.mask.dimensions() {
            return Err(PipelineError::DimensionMismatch {
                photo: photo_dims,
                mask: self.mask.dimensions(),
            });
        }

        let outlines = contour::extract_outlines(&self.mask)?;
        Ok(Outlined {
            photo: self.photo,
            mask: self.mask,
            config: self.config,
            outlines,
        })
    }
}

// ───────────────────────── Stage 1: Outlined ─────────────────────────

/// Pipeline state after outline extraction.
#[must_use = "pipeline stages are consumed by advancing — call .simplify() to continue"]
pub struct Outlined {
    photo: RgbaImage,
    mask: SilhouetteMask,
    config: MeasureConfig,
    outlines: Vec<Polygon>,
}

impl Outlined {
    /// Extracted outlines, largest first.
    #[must_use]
    pub fn outlines(&self) -> &[Polygon] {
        &self.outlines
    }

    /// Apply the dominance test and simplify the largest outline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoDominantRegion`] when no outline is
    /// comparable in size to the image.
    pub fn simplify(self) -> Result<Simplified, PipelineError> {
        let Some(outline) = self.outlines.first() else {
            return Err(PipelineError::NoDominantRegion);
        };
        let (polygon, bbox) =
            simplify::dominant_polygon(outline, self.mask.dimensions(), &self.config);

        if polygon.is_empty() || bbox.is_empty() {
            return Err(PipelineError::NoDominantRegion);
        }

        Ok(Simplified {
            photo: self.photo,
            mask: self.mask,
            config: self.config,
            polygon,
            bbox,
        })
    }
}

// ──────────────────────── Stage 2: Simplified ────────────────────────

/// Pipeline state after polygon simplification.
#[must_use = "pipeline stages are consumed by advancing — call .locate_withers() to continue"]
pub struct Simplified {
    photo: RgbaImage,
    mask: SilhouetteMask,
    config: MeasureConfig,
    polygon: Polygon,
    bbox: BoundingBox,
}

impl Simplified {
    /// The simplified silhouette polygon.
    #[must_use]
    pub const fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Bounding box of the dominant contour.
    #[must_use]
    pub const fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Locate the withers probe line and its intersections.
    ///
    /// Releases the mask: no later stage probes the alpha channel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoToesFound`] when the front-leg scan
    /// finds no toe vertices.
    pub fn locate_withers(self) -> Result<WithersLocated, PipelineError> {
        let span = withers::locate(&self.polygon, self.bbox, &self.mask, &self.config)?;
        Ok(WithersLocated {
            photo: self.photo,
            config: self.config,
            polygon: self.polygon,
            bbox: self.bbox,
            withers: span,
        })
    }
}

// ────────────────────── Stage 3: WithersLocated ──────────────────────

/// Pipeline state after the withers probe.
#[must_use = "pipeline stages are consumed by advancing — call .locate_torso() to continue"]
pub struct WithersLocated {
    photo: RgbaImage,
    config: MeasureConfig,
    polygon: Polygon,
    bbox: BoundingBox,
    withers: WithersSpan,
}

impl WithersLocated {
    /// The withers probe line and intersections.
    #[must_use]
    pub const fn withers(&self) -> WithersSpan {
        self.withers
    }

    /// Locate the torso's rear boundary and measure the neck.
    ///
    /// Both are infallible: the torso scan degrades to 0 without a
    /// slope flip, and the neck is a plain vertex-to-landmark distance.
    pub fn locate_torso(self) -> TorsoLocated {
        let torso_x = torso::locate(&self.polygon, self.bbox, self.withers.x);
        let neck = neck::length(&self.polygon, self.withers.upper);
        TorsoLocated {
            photo: self.photo,
            config: self.config,
            polygon: self.polygon,
            bbox: self.bbox,
            withers: self.withers,
            torso_x,
            neck,
        }
    }
}

// ─────────────────────── Stage 4: TorsoLocated ───────────────────────

/// Pipeline state after the torso and neck stages.
#[must_use = "pipeline stages are consumed by advancing — call .locate_hip() to continue"]
pub struct TorsoLocated {
    photo: RgbaImage,
    config: MeasureConfig,
    polygon: Polygon,
    bbox: BoundingBox,
    withers: WithersSpan,
    torso_x: i32,
    neck: f64,
}

impl TorsoLocated {
    /// Torso rear boundary x (0 when no slope flip was found).
    #[must_use]
    pub const fn torso_x(&self) -> i32 {
        self.torso_x
    }

    /// Neck length in pixels, rounded to one decimal place.
    #[must_use]
    pub const fn neck_length(&self) -> f64 {
        self.neck
    }

    /// Run the multi-pass hip edge search on the photograph.
    ///
    /// Releases the photograph: the remaining stages are pure polygon
    /// arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoHipCandidate`] when the search
    /// exhausts every contrast/dilation combination.
    pub fn locate_hip(self) -> Result<HipLocated, PipelineError> {
        let hip_x = hip::locate(&self.photo, self.bbox, self.torso_x, &self.config)?;
        Ok(HipLocated {
            config: self.config,
            polygon: self.polygon,
            bbox: self.bbox,
            withers: self.withers,
            torso_x: self.torso_x,
            neck: self.neck,
            hip_x,
        })
    }
}

// ──────────────────────── Stage 5: HipLocated ────────────────────────

/// Pipeline state after the hip search.
#[must_use = "pipeline stages are consumed by advancing — call .locate_hindlimb() to continue"]
pub struct HipLocated {
    config: MeasureConfig,
    polygon: Polygon,
    bbox: BoundingBox,
    withers: WithersSpan,
    torso_x: i32,
    neck: f64,
    hip_x: i32,
}

impl HipLocated {
    /// Hip silhouette edge x, in full-image coordinates.
    #[must_use]
    pub const fn hip_x(&self) -> i32 {
        self.hip_x
    }

    /// Locate the hindquarter top and assemble the measurement set.
    pub fn locate_hindlimb(self) -> Done {
        let landmark = hindlimb::locate(
            &self.polygon,
            self.withers.last_toe_x,
            self.config.hindlimb_vertex_cap,
        );

        let measurements = Measurements {
            withers: self.withers.length(),
            torso: torso::length(self.torso_x, self.withers.x),
            neck: self.neck,
            hindlimb: hindlimb::length(self.hip_x, landmark),
        };

        Done {
            staged: StagedMeasurements {
                polygon: self.polygon,
                bounding_box: self.bbox,
                withers: self.withers,
                torso_x: self.torso_x,
                hip_x: self.hip_x,
                hindlimb: landmark,
                measurements,
            },
        }
    }
}

// ─────────────────────────── Stage 6: Done ───────────────────────────

/// Terminal pipeline state holding the assembled results.
#[must_use = "call .into_staged() or .measurements() to consume the results"]
pub struct Done {
    staged: StagedMeasurements,
}

impl Done {
    /// The four derived lengths.
    #[must_use]
    pub const fn measurements(&self) -> Measurements {
        self.staged.measurements
    }

    /// The hindquarter-top landmark.
    #[must_use]
    pub const fn hindlimb(&self) -> Landmark {
        self.staged.hindlimb
    }

    /// Consume the pipeline and keep every intermediate landmark.
    #[must_use]
    pub fn into_staged(self) -> StagedMeasurements {
        self.staged
    }
}
