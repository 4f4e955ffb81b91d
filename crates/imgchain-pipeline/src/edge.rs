//! Gradient-magnitude edge detectors (Sobel, Roberts cross).
//!
//! Both reduce the image to one 8-bit gray plane, convolve it with a
//! horizontal and a vertical kernel (edge-reflect boundary), and emit a
//! binary mask: 255 where `sqrt(gx^2 + gy^2) > threshold`, else 0. The
//! mask is written into every channel of the input's layout.

use serde::{Deserialize, Serialize};

use crate::kernel::{self, Boundary, Kernel};
use crate::operation::{Operation, OperationError, OperationKind, layout_of};
use crate::params::{FieldReader, ParamValues, ParameterSet, ValidationError};
use crate::schema::{FieldDescriptor, Schema};
use crate::tone::MAX_SAMPLE;
use crate::types::{Image, Layout, Plane};

/// Red, green, blue weights used to derive the gray plane.
pub const EDGE_GRAY_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Default magnitude threshold for both detectors.
pub const DEFAULT_EDGE_THRESHOLD: i64 = 128;

fn threshold_schema() -> Schema {
    Schema::empty().field(
        "threshold",
        FieldDescriptor::int_slider(0, 255, 1, DEFAULT_EDGE_THRESHOLD),
    )
}

fn read_threshold(values: &ParamValues, kind: OperationKind) -> Result<i64, ValidationError> {
    FieldReader::new(values, kind, &["threshold"])?.int("threshold", DEFAULT_EDGE_THRESHOLD)
}

/// The plane edge detection runs on.
///
/// Three or more channels are reduced with [`EDGE_GRAY_WEIGHTS`] and cast
/// to `u8` (saturating, truncating toward zero). One channel, or a rank 2
/// image, is used as is. Zero or two channels are rejected.
fn gray_plane(
    image: &Image,
    layout: Layout,
    operation: OperationKind,
) -> Result<Plane, OperationError> {
    let spp = layout.samples_per_pixel();
    let data = match spp {
        1 => image.as_slice().to_vec(),
        0 | 2 => {
            return Err(OperationError::UnsupportedChannels {
                operation,
                channels: spp,
            });
        }
        _ => image
            .as_slice()
            .chunks_exact(spp)
            .map(|px| {
                let weighted: f64 = px.iter().zip(EDGE_GRAY_WEIGHTS).map(|(v, w)| v * w).sum();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let gray = weighted as u8;
                f64::from(gray)
            })
            .collect(),
    };
    Ok(Plane {
        height: layout.height,
        width: layout.width,
        data,
    })
}

/// Threshold the gradient magnitude of `image` into a broadcast mask.
fn edge_mask(
    image: &Image,
    operation: OperationKind,
    horizontal: &Kernel,
    vertical: &Kernel,
    threshold: i64,
) -> Result<Image, OperationError> {
    let layout = layout_of(image)?;
    let gray = gray_plane(image, layout, operation)?;
    let gx = kernel::convolve(&gray, horizontal, Boundary::Reflect);
    let gy = kernel::convolve(&gray, vertical, Boundary::Reflect);

    #[allow(clippy::cast_precision_loss)]
    let threshold = threshold as f64;
    let mask = Plane {
        data: gx
            .data
            .iter()
            .zip(&gy.data)
            .map(|(x, y)| if x.hypot(*y) > threshold { MAX_SAMPLE } else { 0.0 })
            .collect(),
        ..gray
    };
    tracing::trace!(
        %operation,
        edges = mask.data.iter().filter(|&&v| v > 0.0).count(),
        "edge mask"
    );
    Ok(Image::broadcast(layout, &mask))
}

// ─────────────────────────────── Sobel ────────────────────────────────

/// Parameters for [`Sobel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SobelParams {
    /// Magnitudes strictly above this become edges.
    pub threshold: i64,
}

impl Default for SobelParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

impl ParameterSet for SobelParams {
    const KIND: OperationKind = OperationKind::Sobel;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn schema() -> Schema {
        threshold_schema()
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let params = Self {
            threshold: read_threshold(values, Self::KIND)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Sobel 3x3 gradient edge detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sobel;

impl Operation for Sobel {
    type Params = SobelParams;

    fn apply(&self, image: &Image, params: &SobelParams) -> Result<Image, OperationError> {
        params.validate()?;
        edge_mask(
            image,
            SobelParams::KIND,
            &kernel::sobel_x(),
            &kernel::sobel_y(),
            params.threshold,
        )
    }
}

// ────────────────────────────── Roberts ───────────────────────────────

/// Parameters for [`Roberts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobertsParams {
    /// Magnitudes strictly above this become edges.
    pub threshold: i64,
}

impl Default for RobertsParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

impl ParameterSet for RobertsParams {
    const KIND: OperationKind = OperationKind::Roberts;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn schema() -> Schema {
        threshold_schema()
    }

    fn from_values(values: &ParamValues) -> Result<Self, ValidationError> {
        let params = Self {
            threshold: read_threshold(values, Self::KIND)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Roberts cross 2x2 gradient edge detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Roberts;

impl Operation for Roberts {
    type Params = RobertsParams;

    fn apply(&self, image: &Image, params: &RobertsParams) -> Result<Image, OperationError> {
        params.validate()?;
        edge_mask(
            image,
            RobertsParams::KIND,
            &kernel::roberts_x(),
            &kernel::roberts_y(),
            params.threshold,
        )
    }
}
