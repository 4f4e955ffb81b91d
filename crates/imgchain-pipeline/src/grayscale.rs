//! Grayscale conversion.
//!
//! Reduces every pixel to a single intensity and writes it back into
//! every channel, so the output keeps the input's shape. Rank 2 images
//! and single-channel rank 3 images are already an intensity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationError, OperationKind, layout_of};
use crate::params::{FieldReader, ParamValues, ParameterSet, ValidationError, check_finite};
use crate::schema::{Choices, FieldDescriptor, Schema};
use crate::types::{Image, Layout, Plane};

/// Red, green, blue weights for [`GrayscaleMethod::Luminosity`].
pub const LUMINOSITY_WEIGHTS: [f64; 3] = [0.21, 0.72, 0.07];

/// How a pixel's channels are reduced to one intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrayscaleMethod {
    /// Weighted sum of the first three channels ([`LUMINOSITY_WEIGHTS`]).
    #[default]
    Luminosity,
    /// Arithmetic mean of all channels.
    Average,
    /// Maximum over all channels.
    Lightness,
}

impl GrayscaleMethod {
    /// Accepted identifiers, in display order.
    pub const IDS: &'static [&'static str] = &["luminosity", "average", "lightness"];

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Luminosity => "luminosity",
            Self::Average => "average",
            Self::Lightness => "lightness",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Luminosity => "Weighted (Luminosity)",
            Self::Average => "Average",
            Self::Lightness => "Lightness",
        }
    }
}

impl FromStr for GrayscaleMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "luminosity" => Ok(Self::Luminosity),
            "average" => Ok(Self::Average),
            "lightness" => Ok(Self::Lightness),
            other => Err(ValidationError::UnknownOption {
                field: "method",
                value: other.into(),
                expected: Self::IDS,
            }),
        }
    }
}

/// Parameters for [`Grayscale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrayscaleParams {
    /// Channel reduction.
    pub method: GrayscaleMethod,
    /// Multiplier applied to the intensity. Not clamped afterwards.
    pub intensity: f64,
}

impl Default for GrayscaleParams {
    fn default() -> Self {
        Self {
            method: GrayscaleMethod::default(),
            intensity: 1.0,
        }
    }
}

impl ParameterSet for GrayscaleParams {
    const KIND: OperationKind = OperationKind::Grayscale;

    fn validate(&self) -> Result<(), ValidationError> {
        // The method is closed by its type; intensity has no range.
        Ok(())
    }

    fn schema() -> Schema {
        let methods = [
            GrayscaleMethod::Luminosity,
            GrayscaleMethod::Average,
            GrayscaleMethod::Lightness,
        ];
        Schema::empty()
            .field(
                "method",
                FieldDescriptor::Radio {
                    options: Choices::new(
                        methods.iter().map(|m| (m.as_str(), m.label())).collect(),
                    ),
                    default: GrayscaleMethod::default().as_str(),
                },
            )
            .field("intensity", FieldDescriptor::real_slider(0.0, 2.0, 0.01, 1.0))
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let reader = FieldReader::new(values, Self::KIND, &["method", "intensity"])?;
        let method = reader.choice(
            "method",
            GrayscaleMethod::IDS,
            |s| s.parse().ok(),
            GrayscaleMethod::default(),
        )?;
        let intensity = reader.real("intensity", 1.0)?;
        check_finite("intensity", intensity)?;
        let params = Self { method, intensity };
        params.validate()?;
        Ok(params)
    }
}

/// Reduce each pixel to one intensity and broadcast it to all channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Operation for Grayscale {
    type Params = GrayscaleParams;

    fn apply(&self, image: &Image, params: &GrayscaleParams) -> Result<Image, OperationError> {
        params.validate()?;
        let layout = layout_of(image)?;
        let plane = intensity(image, layout, params.method)?;
        let scaled = Plane {
            data: plane.data.iter().map(|v| v * params.intensity).collect(),
            ..plane
        };
        Ok(Image::broadcast(layout, &scaled))
    }
}

/// One intensity per pixel.
fn intensity(
    image: &Image,
    layout: Layout,
    method: GrayscaleMethod,
) -> Result<Plane, OperationError> {
    let spp = layout.samples_per_pixel();
    if spp == 1 {
        return Ok(Plane {
            height: layout.height,
            width: layout.width,
            data: image.as_slice().to_vec(),
        });
    }

    if spp == 0 {
        return Err(OperationError::UnsupportedChannels {
            operation: OperationKind::Grayscale,
            channels: 0,
        });
    }

    let reduce: fn(&[f64]) -> f64 = match method {
        GrayscaleMethod::Luminosity => {
            if spp < LUMINOSITY_WEIGHTS.len() {
                return Err(OperationError::UnsupportedChannels {
                    operation: OperationKind::Grayscale,
                    channels: spp,
                });
            }
            |px: &[f64]| {
                px.iter()
                    .zip(LUMINOSITY_WEIGHTS)
                    .map(|(v, w)| v * w)
                    .sum()
            }
        }
        #[allow(clippy::cast_precision_loss)]
        GrayscaleMethod::Average => |px: &[f64]| px.iter().sum::<f64>() / px.len() as f64,
        GrayscaleMethod::Lightness => {
            |px: &[f64]| px.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }
    };

    Ok(Plane {
        height: layout.height,
        width: layout.width,
        data: image.as_slice().chunks_exact(spp).map(reduce).collect(),
    })
}
