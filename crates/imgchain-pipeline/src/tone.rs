//! Per-sample tone operations: brightness, contrast, binarization, negative.
//!
//! These never look at neighbouring samples or other channels, so they
//! work on the flat sample buffer regardless of channel count.

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationError, OperationKind, layout_of};
use crate::params::{FieldReader, ParamValues, ParameterSet, ValidationError, check_finite};
use crate::schema::{FieldDescriptor, Schema};
use crate::types::Image;

/// Upper bound of the 8-bit sample range.
pub const MAX_SAMPLE: f64 = 255.0;

/// Mid-gray pivot for [`Contrast`].
pub const CONTRAST_PIVOT: f64 = 128.0;

fn clamp_sample(v: f64) -> f64 {
    v.clamp(0.0, MAX_SAMPLE)
}

// ───────────────────────────── Brightness ─────────────────────────────

/// Additive offset applied to every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrightnessParams {
    /// Offset added to each sample before clamping.
    pub value: i64,
}

impl ParameterSet for BrightnessParams {
    const KIND: OperationKind = OperationKind::Brightness;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn schema() -> Schema {
        Schema::empty().field("value", FieldDescriptor::int_slider(-255, 255, 1, 0))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["value"])?;
        let params = Self {
            value: reader.int("value", 0)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// `clamp(x + value, 0, 255)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Brightness;

impl Operation for Brightness {
    type Params = BrightnessParams;

    fn apply(&self, image: &Image, params: &BrightnessParams) -> Result<Image, OperationError> {
        params.validate()?;
        layout_of(image)?;
        #[allow(clippy::cast_precision_loss)]
        let offset = params.value as f64;
        Ok(image.map(|x| clamp_sample(x + offset)))
    }
}

// ────────────────────────────── Contrast ──────────────────────────────

/// Multiplier applied around mid-gray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastParams {
    /// Contrast factor; 1.0 leaves in-range images unchanged.
    pub value: f64,
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl ParameterSet for ContrastParams {
    const KIND: OperationKind = OperationKind::Contrast;

    fn validate(&self) -> Result<(), ValidationError> {
        check_finite("value", self.value)
    }

    fn schema() -> Schema {
        Schema::empty().field("value", FieldDescriptor::real_slider(0.0, 3.0, 0.01, 1.0))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["value"])?;
        let params = Self {
            value: reader.real("value", 1.0)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// `clamp((x - 128) * value + 128, 0, 255)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contrast;

impl Operation for Contrast {
    type Params = ContrastParams;

    fn apply(&self, image: &Image, params: &ContrastParams) -> Result<Image, OperationError> {
        params.validate()?;
        layout_of(image)?;
        let factor = params.value;
        Ok(image.map(|x| clamp_sample((x - CONTRAST_PIVOT).mul_add(factor, CONTRAST_PIVOT))))
    }
}

// ──────────────────────────── Binarization ────────────────────────────

/// Threshold for [`Binarization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinarizationParams {
    /// Samples strictly above this become 255.
    pub threshold: i64,
}

impl Default for BinarizationParams {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ParameterSet for BinarizationParams {
    const KIND: OperationKind = OperationKind::Binarization;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn schema() -> Schema {
        Schema::empty().field("threshold", FieldDescriptor::int_slider(0, 255, 1, 128))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["threshold"])?;
        let params = Self {
            threshold: reader.int("threshold", 128)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// 255 where `x > threshold`, else 0. Channels are thresholded
/// independently.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binarization;

impl Operation for Binarization {
    type Params = BinarizationParams;

    fn apply(&self, image: &Image, params: &BinarizationParams) -> Result<Image, OperationError> {
        params.validate()?;
        layout_of(image)?;
        #[allow(clippy::cast_precision_loss)]
        let threshold = params.threshold as f64;
        Ok(image.map(|x| if x > threshold { MAX_SAMPLE } else { 0.0 }))
    }
}

// ────────────────────────────── Negative ──────────────────────────────

/// [`Negative`] takes no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NegativeParams;

impl ParameterSet for NegativeParams {
    const KIND: OperationKind = OperationKind::Negative;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn schema() -> Schema {
        Schema::empty()
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        FieldReader::new(values, Self::KIND, &[])?;
        Ok(Self)
    }
}

/// `255 - x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negative;

impl Operation for Negative {
    type Params = NegativeParams;

    fn apply(&self, image: &Image, params: &NegativeParams) -> Result<Image, OperationError> {
        params.validate()?;
        layout_of(image)?;
        Ok(image.map(|x| MAX_SAMPLE - x))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray(data: &[f64]) -> Image {
        Image::gray(1, data.len(), data.to_vec()).unwrap()
    }

    #[test]
    fn brightness_offsets_constant_image() {
        let img = Image::filled(vec![3, 3], 100.0).unwrap();
        let out = Brightness.apply(&img, &BrightnessParams { value: 50 }).unwrap();
        assert!(out.as_slice().iter().all(|&v| (v - 150.0).abs() < f64::EPSILON));
    }

    #[test]
    fn brightness_clamps_both_ends() {
        let img = gray(&[0.0, 10.0, 250.0]);
        let up = Brightness.apply(&img, &BrightnessParams { value: 10 }).unwrap();
        assert_eq!(up.as_slice(), &[10.0, 20.0, 255.0]);
        let down = Brightness
            .apply(&img, &BrightnessParams { value: -1000 })
            .unwrap();
        assert_eq!(down.as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn contrast_pivots_on_mid_gray() {
        let img = gray(&[128.0, 138.0, 118.0, 0.0]);
        let out = Contrast.apply(&img, &ContrastParams { value: 2.0 }).unwrap();
        assert_eq!(out.as_slice(), &[128.0, 148.0, 108.0, 0.0]);
    }

    #[test]
    fn contrast_zero_flattens_to_pivot() {
        let img = gray(&[0.0, 77.0, 255.0]);
        let out = Contrast.apply(&img, &ContrastParams { value: 0.0 }).unwrap();
        assert!(out.as_slice().iter().all(|&v| (v - 128.0).abs() < f64::EPSILON));
    }

    #[test]
    fn contrast_output_stays_in_range() {
        let img = gray(&[0.0, 64.0, 200.0, 255.0]);
        for value in [-3.0, 0.5, 1.0, 3.0, 50.0] {
            let out = Contrast.apply(&img, &ContrastParams { value }).unwrap();
            assert!(out.as_slice().iter().all(|v| (0.0..=255.0).contains(v)));
        }
    }

    #[test]
    fn contrast_rejects_nan() {
        let img = gray(&[0.0]);
        let err = Contrast
            .apply(&img, &ContrastParams { value: f64::NAN })
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidParams(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn binarization_is_strictly_greater() {
        let img = gray(&[0.0, 128.0, 129.0, 255.0]);
        let out = Binarization
            .apply(&img, &BinarizationParams::default())
            .unwrap();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 255.0, 255.0]);
    }

    #[test]
    fn binarization_thresholds_channels_independently() {
        let img = Image::multi(1, 1, 3, vec![200.0, 50.0, 129.0]).unwrap();
        let out = Binarization
            .apply(&img, &BinarizationParams { threshold: 128 })
            .unwrap();
        assert_eq!(out.as_slice(), &[255.0, 0.0, 255.0]);
    }

    #[test]
    fn negative_is_an_involution() {
        let img = Image::multi(2, 2, 3, (0..12).map(|i| f64::from(i) * 20.0).collect()).unwrap();
        let once = Negative.apply(&img, &NegativeParams).unwrap();
        let twice = Negative.apply(&once, &NegativeParams).unwrap();
        assert_eq!(twice, img);
        assert!((once.as_slice()[1] - 235.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tone_ops_reject_rank_one() {
        let img = Image::from_shape_vec(vec![4], vec![0.0; 4]).unwrap();
        assert!(matches!(
            Negative.apply(&img, &NegativeParams),
            Err(OperationError::Dimensionality { rank: 1, .. })
        ));
    }

    #[test]
    fn from_values_reads_fields_and_defaults() {
        let p = BrightnessParams::from_values(&ParamValues::new().with("value", -20_i64)).unwrap();
        assert_eq!(p.value, -20);
        let p = ContrastParams::from_values(&ParamValues::new()).unwrap();
        assert!((p.value - 1.0).abs() < f64::EPSILON);
        let p = BinarizationParams::from_values(&ParamValues::new()).unwrap();
        assert_eq!(p.threshold, 128);
    }

    #[test]
    fn from_values_rejects_real_threshold() {
        let err = BinarizationParams::from_values(&ParamValues::new().with("threshold", 12.5))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotAnInteger { .. }));
    }

    #[test]
    fn negative_rejects_any_field() {
        let err = NegativeParams::from_values(&ParamValues::new().with("value", 1_i64))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn schemas_match_field_sets() {
        assert_eq!(BrightnessParams::schema().names().collect::<Vec<_>>(), ["value"]);
        assert_eq!(ContrastParams::schema().names().collect::<Vec<_>>(), ["value"]);
        assert_eq!(
            BinarizationParams::schema().names().collect::<Vec<_>>(),
            ["threshold"]
        );
        assert!(NegativeParams::schema().is_empty());
    }
}
