//! Convolution filters: average (box), Gaussian, and sharpening.
//!
//! Every channel is convolved independently with the same kernel and the
//! results are restacked in the input channel order. Outputs are not
//! clamped; see [`Image::to_dynamic`] for the final 8-bit conversion.

use serde::{Deserialize, Serialize};

use crate::kernel::{self, Boundary, Kernel};
use crate::operation::{Operation, OperationError, OperationKind, layout_of};
use crate::params::{
    FieldReader, MIN_KERNEL_SIZE, ParamValues, ParameterSet, ValidationError, check_finite,
    check_kernel_size, check_positive,
};
use crate::schema::{FieldDescriptor, Schema};
use crate::types::Image;

/// Largest kernel size offered by the schemas. Larger odd sizes are
/// still accepted.
pub const MAX_SCHEMA_KERNEL_SIZE: i64 = 21;

fn kernel_size_field() -> FieldDescriptor {
    FieldDescriptor::int_slider(
        i64::from(MIN_KERNEL_SIZE),
        MAX_SCHEMA_KERNEL_SIZE,
        2,
        i64::from(MIN_KERNEL_SIZE),
    )
}

/// Convolve every channel of `image` with `kernel`.
fn convolve_channels(
    image: &Image,
    kernel: &Kernel,
    boundary: Boundary,
) -> Result<Image, OperationError> {
    let layout = layout_of(image)?;
    let planes: Vec<_> = image
        .planes(layout)
        .iter()
        .map(|plane| kernel::convolve(plane, kernel, boundary))
        .collect();
    Ok(Image::from_planes(layout, &planes))
}

// ────────────────────────────── Average ───────────────────────────────

/// Parameters for [`Average`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageParams {
    /// Side length of the square kernel. Odd, at least 3.
    pub kernel_size: u32,
}

impl Default for AverageParams {
    fn default() -> Self {
        Self {
            kernel_size: MIN_KERNEL_SIZE,
        }
    }
}

impl ParameterSet for AverageParams {
    const KIND: OperationKind = OperationKind::Average;

    fn validate(&self) -> Result<(), ValidationError> {
        check_kernel_size(i64::from(self.kernel_size))
    }

    fn schema() -> Schema {
        Schema::empty().field("kernel_size", kernel_size_field())
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["kernel_size"])?;
        let params = Self {
            kernel_size: reader.kernel_size(MIN_KERNEL_SIZE)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Box filter with edge-reflect boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Average;

impl Operation for Average {
    type Params = AverageParams;

    fn apply(&self, image: &Image, params: &AverageParams) -> Result<Image, OperationError> {
        let kernel = kernel::average(params)?;
        convolve_channels(image, &kernel, Boundary::Reflect)
    }
}

// ────────────────────────────── Gaussian ──────────────────────────────

/// Parameters for [`Gaussian`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    /// Side length of the square kernel. Odd, at least 3.
    pub kernel_size: u32,
    /// Standard deviation in pixels. Strictly positive.
    pub sigma: f64,
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self {
            kernel_size: MIN_KERNEL_SIZE,
            sigma: 1.0,
        }
    }
}

impl ParameterSet for GaussianParams {
    const KIND: OperationKind = OperationKind::Gaussian;

    fn validate(&self) -> Result<(), ValidationError> {
        check_kernel_size(i64::from(self.kernel_size))?;
        check_positive("sigma", self.sigma)?;
        check_finite("sigma", self.sigma)
    }

    fn schema() -> Schema {
        Schema::empty()
            .field("kernel_size", kernel_size_field())
            .field("sigma", FieldDescriptor::real_slider(0.1, 5.0, 0.1, 1.0))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["kernel_size", "sigma"])?;
        let params = Self {
            kernel_size: reader.kernel_size(MIN_KERNEL_SIZE)?,
            sigma: reader.real("sigma", 1.0)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Gaussian blur with zero padding.
///
/// Zero padding darkens a band about `kernel_size / 2` pixels wide along
/// the border.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl Operation for Gaussian {
    type Params = GaussianParams;

    fn apply(&self, image: &Image, params: &GaussianParams) -> Result<Image, OperationError> {
        let kernel = kernel::gaussian(params)?;
        convolve_channels(image, &kernel, Boundary::Zero)
    }
}

// ───────────────────────────── Sharpening ─────────────────────────────

/// Parameters for [`Sharpening`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpeningParams {
    /// Side length of the square kernel. Odd, at least 3.
    pub kernel_size: u32,
    /// Sharpening strength. Strictly positive.
    pub alpha: f64,
}

impl Default for SharpeningParams {
    fn default() -> Self {
        Self {
            kernel_size: MIN_KERNEL_SIZE,
            alpha: 1.0,
        }
    }
}

impl ParameterSet for SharpeningParams {
    const KIND: OperationKind = OperationKind::Sharpening;

    fn validate(&self) -> Result<(), ValidationError> {
        check_kernel_size(i64::from(self.kernel_size))?;
        check_positive("alpha", self.alpha)?;
        check_finite("alpha", self.alpha)
    }

    fn schema() -> Schema {
        Schema::empty()
            .field("kernel_size", kernel_size_field())
            .field("alpha", FieldDescriptor::real_slider(0.1, 5.0, 0.1, 1.0))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["kernel_size", "alpha"])?;
        let params = Self {
            kernel_size: reader.kernel_size(MIN_KERNEL_SIZE)?,
            alpha: reader.real("alpha", 1.0)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Sharpening kernel with edge-reflect boundary.
///
/// The kernel sums to `alpha`, so flat regions are scaled by `alpha`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sharpening;

impl Operation for Sharpening {
    type Params = SharpeningParams;

    fn apply(&self, image: &Image, params: &SharpeningParams) -> Result<Image, OperationError> {
        let kernel = kernel::sharpening(params)?;
        convolve_channels(image, &kernel, Boundary::Reflect)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn all_close(actual: &[f64], expected: f64) -> bool {
        actual.iter().all(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn average_keeps_flat_image() {
        let img = Image::filled(vec![4, 5], 42.0).unwrap();
        let out = Average.apply(&img, &AverageParams::default()).unwrap();
        assert_eq!(out.shape(), img.shape());
        assert!(all_close(out.as_slice(), 42.0));
    }

    #[test]
    fn average_smooths_impulse() {
        let img = Image::from_gray_fn(3, 3, |y, x| if (y, x) == (1, 1) { 90.0 } else { 0.0 });
        let out = Average.apply(&img, &AverageParams::default()).unwrap();
        assert!(all_close(out.as_slice(), 10.0));
    }

    #[test]
    fn channels_are_independent() {
        // Channel 0 constant 10, channel 1 constant 200.
        let data = (0..9).flat_map(|_| [10.0, 200.0]).collect();
        let img = Image::multi(3, 3, 2, data).unwrap();
        let out = Average.apply(&img, &AverageParams { kernel_size: 5 }).unwrap();
        let planes = out.planes(out.layout().unwrap());
        assert!(all_close(&planes[0].data, 10.0));
        assert!(all_close(&planes[1].data, 200.0));
    }

    #[test]
    fn zero_channels_give_empty_output() {
        let img = Image::multi(2, 2, 0, Vec::new()).unwrap();
        let out = Gaussian.apply(&img, &GaussianParams::default()).unwrap();
        assert_eq!(out.shape(), &[2, 2, 0]);
        assert!(out.as_slice().is_empty());
    }

    #[test]
    fn gaussian_with_tiny_sigma_is_identity() {
        let img = Image::filled(vec![3, 3], 100.0).unwrap();
        let params = GaussianParams {
            kernel_size: 3,
            sigma: 1e-160,
        };
        let out = Gaussian.apply(&img, &params).unwrap();
        assert!(all_close(out.as_slice(), 100.0));
    }

    #[test]
    fn gaussian_preserves_interior_of_flat_image() {
        let img = Image::filled(vec![7, 7], 100.0).unwrap();
        let out = Gaussian.apply(&img, &GaussianParams::default()).unwrap();
        let center = out.pixel(3, 3).unwrap()[0];
        assert!((center - 100.0).abs() < 1e-9);
        // Zero padding pulls the corner down.
        assert!(out.pixel(0, 0).unwrap()[0] < 100.0);
    }

    #[test]
    fn gaussian_validation_gates_apply() {
        let img = Image::filled(vec![3, 3], 1.0).unwrap();
        let even = Gaussian.apply(
            &img,
            &GaussianParams {
                kernel_size: 4,
                sigma: 1.0,
            },
        );
        assert_eq!(
            even,
            Err(OperationError::InvalidParams(
                ValidationError::EvenKernelSize(4)
            ))
        );
        let flat = Gaussian.apply(
            &img,
            &GaussianParams {
                kernel_size: 3,
                sigma: 0.0,
            },
        );
        assert!(matches!(
            flat,
            Err(OperationError::InvalidParams(ValidationError::NotPositive {
                field: "sigma",
                ..
            }))
        ));
    }

    #[test]
    fn sharpening_scales_flat_image_by_alpha() {
        let img = Image::filled(vec![3, 4, 3], 50.0).unwrap();
        let out = Sharpening
            .apply(
                &img,
                &SharpeningParams {
                    kernel_size: 3,
                    alpha: 2.0,
                },
            )
            .unwrap();
        assert!(all_close(out.as_slice(), 100.0));
    }

    #[test]
    fn sharpening_output_is_not_clamped() {
        let img = Image::from_gray_fn(3, 3, |y, x| if (y, x) == (1, 1) { 255.0 } else { 0.0 });
        let out = Sharpening
            .apply(&img, &SharpeningParams::default())
            .unwrap();
        assert!(out.pixel(1, 1).unwrap()[0] > 255.0);
        assert!(out.pixel(0, 0).unwrap()[0] < 0.0);
    }

    #[test]
    fn sharpening_rejects_small_kernel() {
        let img = Image::filled(vec![3, 3], 1.0).unwrap();
        let err = Sharpening
            .apply(
                &img,
                &SharpeningParams {
                    kernel_size: 1,
                    alpha: 1.0,
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            OperationError::InvalidParams(ValidationError::KernelTooSmall { min: 3, actual: 1 })
        );
    }

    #[test]
    fn rank_one_is_rejected_after_validation() {
        let img = Image::from_shape_vec(vec![3], vec![0.0; 3]).unwrap();
        assert!(matches!(
            Average.apply(&img, &AverageParams::default()),
            Err(OperationError::Dimensionality { rank: 1, .. })
        ));
    }

    #[test]
    fn from_values_rejects_even_and_small_sizes() {
        let even = AverageParams::from_values(&ParamValues::new().with("kernel_size", 4_i64));
        assert_eq!(even, Err(ValidationError::EvenKernelSize(4)));
        let small = GaussianParams::from_values(&ParamValues::new().with("kernel_size", 1_i64));
        assert!(matches!(
            small,
            Err(ValidationError::KernelTooSmall { .. })
        ));
        let negative = SharpeningParams::from_values(&ParamValues::new().with("alpha", -0.5));
        assert!(matches!(
            negative,
            Err(ValidationError::NotPositive { field: "alpha", .. })
        ));
    }

    #[test]
    fn from_values_accepts_large_odd_size() {
        let p = AverageParams::from_values(&ParamValues::new().with("kernel_size", 31_i64))
            .unwrap();
        assert_eq!(p.kernel_size, 31);
    }

    #[test]
    fn schemas_offer_odd_sizes() {
        let json = serde_json::to_value(GaussianParams::schema()).unwrap();
        assert_eq!(json["kernel_size"]["min"], 3);
        assert_eq!(json["kernel_size"]["max"], 21);
        assert_eq!(json["kernel_size"]["step"], 2);
        assert_eq!(json["sigma"]["default"], 1.0);
    }
}
