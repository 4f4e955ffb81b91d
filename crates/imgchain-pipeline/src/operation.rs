//! The operation capability and the closed set of operation kinds.
//!
//! Each concrete operation is a stateless unit struct implementing
//! [`Operation`], which pairs it with exactly one [`ParameterSet`] type
//! at compile time. [`OperationKind`] and [`Params`] are the type-erased
//! forms of the same closed set, used where a host picks operations at
//! runtime (registry lookups, pipeline storage).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::convolution::{
    Average, AverageParams, Gaussian, GaussianParams, Sharpening, SharpeningParams,
};
use crate::edge::{Roberts, RobertsParams, Sobel, SobelParams};
use crate::grayscale::{Grayscale, GrayscaleParams};
use crate::params::{ParameterSet, ValidationError};
use crate::schema::Schema;
use crate::tone::{
    Binarization, BinarizationParams, Brightness, BrightnessParams, Contrast, ContrastParams,
    Negative, NegativeParams,
};
use crate::types::{Image, ImageError, Layout};

/// A stateless image transform.
///
/// Implementations validate `params` before touching the image and
/// return a new image; the input is never modified.
pub trait Operation: fmt::Debug + Default + Send + Sync {
    /// The only parameter set this operation accepts.
    type Params: ParameterSet + Into<Params>;

    /// Apply the transform.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParams`] if validation fails and
    /// [`OperationError::Dimensionality`] if the image rank is not 2 or 3.
    fn apply(&self, image: &Image, params: &Self::Params) -> Result<Image, OperationError>;
}

/// Errors raised by an operation's `apply`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// The parameters failed validation; no transform ran.
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] ValidationError),

    /// The image rank is neither 2 nor 3.
    #[error("unsupported image rank {rank} (shape {shape:?}), expected 2 or 3")]
    Dimensionality {
        /// Number of axes of the rejected image.
        rank: usize,
        /// Shape of the rejected image.
        shape: Vec<usize>,
    },

    /// The operation cannot derive an intensity from this many channels.
    #[error("{operation} cannot process {channels} channels")]
    UnsupportedChannels {
        /// Operation that rejected the image.
        operation: OperationKind,
        /// Channel count of the rejected image.
        channels: usize,
    },

    /// An operation was handed parameters of a different kind.
    #[error("{operation} cannot be applied with {params} parameters")]
    TypeMismatch {
        /// The operation.
        operation: OperationKind,
        /// The kind the parameters belong to.
        params: OperationKind,
    },

    /// The image could not be converted to an 8-bit raster.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// The image's layout, or a dimensionality error.
pub(crate) fn layout_of(image: &Image) -> Result<Layout, OperationError> {
    image.layout().ok_or_else(|| OperationError::Dimensionality {
        rank: image.rank(),
        shape: image.shape().to_vec(),
    })
}

/// Identifies one of the supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Additive brightness offset.
    Brightness,
    /// Contrast around mid-gray.
    Contrast,
    /// Single-intensity conversion broadcast to all channels.
    Grayscale,
    /// Per-sample threshold to {0, 255}.
    Binarization,
    /// `255 - x`.
    Negative,
    /// Box filter.
    Average,
    /// Gaussian blur.
    Gaussian,
    /// Unsharp-style sharpening kernel.
    Sharpening,
    /// Sobel edge mask.
    Sobel,
    /// Roberts cross edge mask.
    Roberts,
}

impl OperationKind {
    /// Every kind, in the order hosts should list them.
    pub const ALL: [Self; 10] = [
        Self::Brightness,
        Self::Contrast,
        Self::Grayscale,
        Self::Binarization,
        Self::Negative,
        Self::Average,
        Self::Gaussian,
        Self::Sharpening,
        Self::Sobel,
        Self::Roberts,
    ];

    /// Stable string identifier (e.g. `"gaussian"`).
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Grayscale => "grayscale",
            Self::Binarization => "binarization",
            Self::Negative => "negative",
            Self::Average => "average",
            Self::Gaussian => "gaussian",
            Self::Sharpening => "sharpening",
            Self::Sobel => "sobel",
            Self::Roberts => "roberts",
        }
    }

    /// Schema of this kind's parameter set.
    #[must_use]
    pub fn schema(self) -> Schema {
        match self {
            Self::Brightness => BrightnessParams::schema(),
            Self::Contrast => ContrastParams::schema(),
            Self::Grayscale => GrayscaleParams::schema(),
            Self::Binarization => BinarizationParams::schema(),
            Self::Negative => NegativeParams::schema(),
            Self::Average => AverageParams::schema(),
            Self::Gaussian => GaussianParams::schema(),
            Self::Sharpening => SharpeningParams::schema(),
            Self::Sobel => SobelParams::schema(),
            Self::Roberts => RobertsParams::schema(),
        }
    }

    /// Apply the operation of this kind.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::TypeMismatch`] if `params` belongs to a
    /// different kind, otherwise whatever the operation's `apply` returns.
    pub fn apply(self, image: &Image, params: &Params) -> Result<Image, OperationError> {
        match (self, params) {
            (Self::Brightness, Params::Brightness(p)) => Brightness.apply(image, p),
            (Self::Contrast, Params::Contrast(p)) => Contrast.apply(image, p),
            (Self::Grayscale, Params::Grayscale(p)) => Grayscale.apply(image, p),
            (Self::Binarization, Params::Binarization(p)) => Binarization.apply(image, p),
            (Self::Negative, Params::Negative(p)) => Negative.apply(image, p),
            (Self::Average, Params::Average(p)) => Average.apply(image, p),
            (Self::Gaussian, Params::Gaussian(p)) => Gaussian.apply(image, p),
            (Self::Sharpening, Params::Sharpening(p)) => Sharpening.apply(image, p),
            (Self::Sobel, Params::Sobel(p)) => Sobel.apply(image, p),
            (Self::Roberts, Params::Roberts(p)) => Roberts.apply(image, p),
            (operation, params) => Err(OperationError::TypeMismatch {
                operation,
                params: params.kind(),
            }),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when parsing an identifier no operation uses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation {0:?}")]
pub struct UnknownOperation(pub String);

impl FromStr for OperationKind {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnknownOperation(s.to_owned()))
    }
}

/// Type-erased parameter set: one variant per [`OperationKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", content = "params", rename_all = "lowercase")]
pub enum Params {
    /// Parameters for [`Brightness`].
    Brightness(BrightnessParams),
    /// Parameters for [`Contrast`].
    Contrast(ContrastParams),
    /// Parameters for [`Grayscale`].
    Grayscale(GrayscaleParams),
    /// Parameters for [`Binarization`].
    Binarization(BinarizationParams),
    /// Parameters for [`Negative`].
    Negative(NegativeParams),
    /// Parameters for [`Average`].
    Average(AverageParams),
    /// Parameters for [`Gaussian`].
    Gaussian(GaussianParams),
    /// Parameters for [`Sharpening`].
    Sharpening(SharpeningParams),
    /// Parameters for [`Sobel`].
    Sobel(SobelParams),
    /// Parameters for [`Roberts`].
    Roberts(RobertsParams),
}

impl Params {
    /// The kind these parameters belong to.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Brightness(_) => OperationKind::Brightness,
            Self::Contrast(_) => OperationKind::Contrast,
            Self::Grayscale(_) => OperationKind::Grayscale,
            Self::Binarization(_) => OperationKind::Binarization,
            Self::Negative(_) => OperationKind::Negative,
            Self::Average(_) => OperationKind::Average,
            Self::Gaussian(_) => OperationKind::Gaussian,
            Self::Sharpening(_) => OperationKind::Sharpening,
            Self::Sobel(_) => OperationKind::Sobel,
            Self::Roberts(_) => OperationKind::Roberts,
        }
    }

    /// Validate the wrapped parameter set.
    ///
    /// # Errors
    ///
    /// Returns the wrapped set's [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Brightness(p) => p.validate(),
            Self::Contrast(p) => p.validate(),
            Self::Grayscale(p) => p.validate(),
            Self::Binarization(p) => p.validate(),
            Self::Negative(p) => p.validate(),
            Self::Average(p) => p.validate(),
            Self::Gaussian(p) => p.validate(),
            Self::Sharpening(p) => p.validate(),
            Self::Sobel(p) => p.validate(),
            Self::Roberts(p) => p.validate(),
        }
    }
}

impl From<BrightnessParams> for Params {
    fn from(p: BrightnessParams) -> Self {
        Self::Brightness(p)
    }
}

impl From<ContrastParams> for Params {
    fn from(p: ContrastParams) -> Self {
        Self::Contrast(p)
    }
}

impl From<GrayscaleParams> for Params {
    fn from(p: GrayscaleParams) -> Self {
        Self::Grayscale(p)
    }
}

impl From<BinarizationParams> for Params {
    fn from(p: BinarizationParams) -> Self {
        Self::Binarization(p)
    }
}

impl From<NegativeParams> for Params {
    fn from(p: NegativeParams) -> Self {
        Self::Negative(p)
    }
}

impl From<AverageParams> for Params {
    fn from(p: AverageParams) -> Self {
        Self::Average(p)
    }
}

impl From<GaussianParams> for Params {
    fn from(p: GaussianParams) -> Self {
        Self::Gaussian(p)
    }
}

impl From<SharpeningParams> for Params {
    fn from(p: SharpeningParams) -> Self {
        Self::Sharpening(p)
    }
}

impl From<SobelParams> for Params {
    fn from(p: SobelParams) -> Self {
        Self::Sobel(p)
    }
}

impl From<RobertsParams> for Params {
    fn from(p: RobertsParams) -> Self {
        Self::Roberts(p)
    }
}
