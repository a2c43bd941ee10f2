//! equimark-pipeline: Pure horse body-measurement pipeline (sans-IO).
//!
//! Derives four body-segment lengths in pixels from a side-profile
//! photograph and its segmentation mask:
//! outline extraction -> polygon simplification -> withers probe ->
//! torso scan -> neck distance -> hip edge search -> hindlimb span.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! rasters and returns structured data. Decoding files and reporting
//! results lives in `equimark-measure`.
//!
//! The mask comes from an external segmentation step and is consumed
//! as-is: the alpha channel is the silhouette, fully opaque pixels are
//! the subject. All landmark heuristics assume a side profile facing
//! left (head on the left of the frame).

pub mod contour;
pub mod hindlimb;
pub mod hip;
pub mod mask;
pub mod neck;
pub mod pipeline;
pub mod simplify;
pub mod torso;
pub mod types;
pub mod withers;

pub use mask::SilhouetteMask;
pub use pipeline::Pending;
pub use types::{
    BoundingBox, Dimensions, Landmark, MeasureConfig, Measurements, PipelineError, Point, Polygon,
    RgbaImage, StagedMeasurements, WithersSpan,
};

/// Run the full measurement pipeline.
///
/// Takes the photograph, its silhouette mask, and a configuration, and
/// produces the four body-segment lengths. Use [`measure_staged`] to
/// also keep the intermediate landmarks.
///
/// # Pipeline steps
///
/// 1. Denoise the mask alpha channel and extract outer outlines
/// 2. Dominance test and polygon simplification (Ramer-Douglas-Peucker)
/// 3. Withers probe: toe vertices, vertical probe line, span
/// 4. Torso scan: slope flip along the back line
/// 5. Neck: topmost vertex to the upper withers point
/// 6. Hip edge search on the photograph (multi-pass contrast/dilation)
/// 7. Hindlimb: hindquarter top to the hip edge
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an unusable
/// configuration, [`PipelineError::EmptyInput`] or
/// [`PipelineError::DimensionMismatch`] for unusable rasters, and one
/// of [`PipelineError::NoContourFound`],
/// [`PipelineError::NoDominantRegion`], [`PipelineError::NoToesFound`],
/// [`PipelineError::NoHipCandidate`] when a locator cannot find its
/// landmark.
pub fn measure(
    photo: RgbaImage,
    mask: SilhouetteMask,
    config: &MeasureConfig,
) -> Result<Measurements, PipelineError> {
    measure_staged(photo, mask, config).map(|staged| staged.measurements)
}

/// Run the full measurement pipeline, keeping intermediate landmarks.
///
/// Identical to [`measure`] but returns the simplified polygon, the
/// bounding box, and every located landmark alongside the lengths, for
/// diagnostic overlays.
///
/// # Errors
///
/// Same as [`measure`].
pub fn measure_staged(
    photo: RgbaImage,
    mask: SilhouetteMask,
    config: &MeasureConfig,
) -> Result<StagedMeasurements, PipelineError> {
    Ok(Pending::new(photo, mask, config.clone())
        .extract()?
        .simplify()?
        .locate_withers()?
        .locate_torso()
        .locate_hip()?
        .locate_hindlimb()
        .into_staged())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Blocky side-profile silhouette in a 200x200 frame, head on the
    /// left. Coordinates are unscaled; callers divide pixel positions
    /// by the scale factor before testing membership.
    ///
    /// The back line is flat over the withers, dips behind them, and
    /// rises into the croup, so the torso scan sees a slope flip in
    /// either walking direction. The rear leg stops above the toe line
    /// so only the front leg contributes toe vertices.
    fn horse_shape(u: f64, v: f64) -> bool {
        let back = if u < 75.0 {
            60.0
        } else if u < 100.0 {
            60.0 + (u - 75.0) * 14.0 / 25.0
        } else if u < 140.0 {
            74.0 - (u - 100.0) * 16.0 / 40.0
        } else {
            58.0 + (u - 140.0) * 4.0 / 30.0
        };
        let head = (30.0..55.0).contains(&u) && (20.0..110.0).contains(&v);
        let body = (55.0..170.0).contains(&u) && v >= back && v < 110.0;
        let front_leg = (56.0..71.0).contains(&u) && (110.0..185.0).contains(&v);
        let rear_leg = (141.0..160.0).contains(&u) && (110.0..150.0).contains(&v);
        head || body || front_leg || rear_leg
    }

    fn horse_mask(scale: u32) -> SilhouetteMask {
        let side = 200 * scale;
        let image = RgbaImage::from_fn(side, side, |x, y| {
            let u = f64::from(x) / f64::from(scale);
            let v = f64::from(y) / f64::from(scale);
            if horse_shape(u, v) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        SilhouetteMask::new(image).unwrap()
    }

    /// Matching photograph: warm coat on a dark background, with two
    /// dark vertical flank stripes crossing the hindquarters so the
    /// hip edge search has strong vertical features to latch onto.
    fn horse_photo(scale: u32) -> RgbaImage {
        let side = 200 * scale;
        RgbaImage::from_fn(side, side, |x, y| {
            let u = f64::from(x) / f64::from(scale);
            let v = f64::from(y) / f64::from(scale);
            let stripe = ((150.0..153.0).contains(&u) || (158.0..161.0).contains(&u))
                && (40.0..105.0).contains(&v);
            if stripe {
                Rgba([40, 36, 32, 255])
            } else if horse_shape(u, v) {
                Rgba([172, 150, 126, 255])
            } else {
                Rgba([12, 12, 12, 255])
            }
        })
    }

    #[test]
    fn measure_rejects_dimension_mismatch() {
        let photo = RgbaImage::new(100, 100);
        let result = measure(photo, horse_mask(1), &MeasureConfig::default());
        assert!(matches!(result, Err(PipelineError::DimensionMismatch { .. })));
    }

    #[test]
    fn measure_rejects_zero_size_photo() {
        let result = measure(
            RgbaImage::new(0, 10),
            horse_mask(1),
            &MeasureConfig::default(),
        );
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn measure_rejects_invalid_config() {
        let config = MeasureConfig {
            dominance_scale: 0.0,
            ..MeasureConfig::default()
        };
        let result = measure(horse_photo(1), horse_mask(1), &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn all_transparent_mask_has_no_contour() {
        let mask = SilhouetteMask::new(RgbaImage::new(200, 200)).unwrap();
        let result = measure(horse_photo(1), mask, &MeasureConfig::default());
        assert!(matches!(result, Err(PipelineError::NoContourFound)));
    }

    #[test]
    fn small_blob_is_not_dominant() {
        let image = RgbaImage::from_fn(200, 200, |x, y| {
            if (90..102).contains(&x) && (90..102).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mask = SilhouetteMask::new(image).unwrap();
        let result = measure(horse_photo(1), mask, &MeasureConfig::default());
        assert!(matches!(result, Err(PipelineError::NoDominantRegion)));
    }

    #[test]
    fn measures_synthetic_horse() {
        let staged = measure_staged(horse_photo(1), horse_mask(1), &MeasureConfig::default())
            .expect("synthetic horse should measure");

        // Bounding box of the silhouette, give or take the mask
        // denoising at the boundary.
        let bbox = staged.bounding_box;
        assert!((28..=32).contains(&bbox.x), "bbox.x = {}", bbox.x);
        assert!((18..=23).contains(&bbox.y), "bbox.y = {}", bbox.y);
        assert!((134..=145).contains(&bbox.width), "bbox.width = {}", bbox.width);
        assert!((159..=170).contains(&bbox.height), "bbox.height = {}", bbox.height);

        // The probe line sits on the front leg; the span runs from the
        // back line down to the toes.
        let withers = staged.withers;
        assert!((65..=75).contains(&withers.x), "withers.x = {}", withers.x);
        assert!((55..=66).contains(&withers.upper.y), "upper.y = {}", withers.upper.y);
        assert!((179..=188).contains(&withers.lower.y), "lower.y = {}", withers.lower.y);

        let m = staged.measurements;
        assert!((108.0..=135.0).contains(&m.withers), "withers = {}", m.withers);

        // The slope flip lands in the dip-to-croup stretch.
        assert!((90..=150).contains(&staged.torso_x), "torso_x = {}", staged.torso_x);
        assert!((20.0..=85.0).contains(&m.torso), "torso = {}", m.torso);

        // Head top to the upper withers point.
        assert!((35.0..=65.0).contains(&m.neck), "neck = {}", m.neck);

        // The hip edge comes from the flank stripes (or degrades to
        // the torso boundary); either way it stays in the hindquarters.
        assert!((90..=171).contains(&staged.hip_x), "hip_x = {}", staged.hip_x);

        // Hindquarter top is on the croup.
        assert!((50..=70).contains(&staged.hindlimb.y), "hindlimb.y = {}", staged.hindlimb.y);
        assert!((100..=171).contains(&staged.hindlimb.x), "hindlimb.x = {}", staged.hindlimb.x);
    }

    #[test]
    fn measurement_is_deterministic() {
        let config = MeasureConfig::default();
        let first = measure(horse_photo(1), horse_mask(1), &config).unwrap();
        let second = measure(horse_photo(1), horse_mask(1), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn staged_and_plain_measurements_agree() {
        let config = MeasureConfig::default();
        let staged = measure_staged(horse_photo(1), horse_mask(1), &config).unwrap();
        let plain = measure(horse_photo(1), horse_mask(1), &config).unwrap();
        assert_eq!(staged.measurements, plain);
    }

    #[test]
    fn measurements_scale_with_the_image() {
        let config = MeasureConfig::default();
        let at = |scale: u32| {
            measure_staged(horse_photo(scale), horse_mask(scale), &config).unwrap()
        };

        let small = at(1);
        let large = at(2);

        let withers_ratio = large.measurements.withers / small.measurements.withers;
        assert!(
            (1.8..=2.2).contains(&withers_ratio),
            "expected the withers span to double, got {} -> {}",
            small.measurements.withers,
            large.measurements.withers
        );

        let neck_ratio = large.measurements.neck / small.measurements.neck;
        assert!(
            (1.8..=2.2).contains(&neck_ratio),
            "expected the neck to double, got {} -> {}",
            small.measurements.neck,
            large.measurements.neck
        );

        // Polygon simplification shifts the torso boundary a vertex or
        // two between scales, so the torso tolerance is looser.
        let torso_ratio = large.measurements.torso / small.measurements.torso;
        assert!(
            (1.6..=2.4).contains(&torso_ratio),
            "expected the torso to roughly double, got {} -> {}",
            small.measurements.torso,
            large.measurements.torso
        );

        // The hip search is the most heuristic stage: pin it to the
        // rear-crop window rather than to a ratio, and check the
        // hindlimb span stays in range.
        assert!(
            (180..=342).contains(&large.hip_x),
            "hip edge outside the rear crop: {}",
            large.hip_x
        );
        assert!(large.measurements.hindlimb >= 0.0);
    }
}
