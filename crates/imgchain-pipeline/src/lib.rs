//! imgchain-pipeline: pure image operation pipeline (sans-IO).
//!
//! A closed set of raster operations (tone adjustments, convolution
//! filters, edge detectors), each paired at compile time with one
//! validated [`ParameterSet`], chained by a [`Pipeline`] over an
//! in-memory [`Image`].
//!
//! This crate has **no I/O dependencies**: hosts decode and encode
//! images (see [`Image::from_dynamic`] and [`Image::to_dynamic`]) and
//! drive the pipeline. Parameter [`Schema`]s let a host build input
//! widgets without the core knowing anything about them.
//!
//! ```rust
//! use imgchain_pipeline::{Image, Operation, Brightness, BrightnessParams};
//!
//! let image = Image::filled(vec![3, 3], 100.0).unwrap();
//! let brighter = Brightness.apply(&image, &BrightnessParams { value: 50 }).unwrap();
//! assert!(brighter.as_slice().iter().all(|&v| v == 150.0));
//! ```

pub mod analysis;
pub mod convolution;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod kernel;
pub mod operation;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod tone;
pub mod types;

pub use convolution::{
    Average, AverageParams, Gaussian, GaussianParams, Sharpening, SharpeningParams,
};
pub use diagnostics::{Clock, PipelineDiagnostics, StepDiagnostics};
pub use edge::{Roberts, RobertsParams, Sobel, SobelParams};
pub use grayscale::{Grayscale, GrayscaleMethod, GrayscaleParams};
pub use kernel::{Boundary, Kernel};
pub use operation::{Operation, OperationError, OperationKind, Params, UnknownOperation};
pub use params::{ParamValue, ParamValues, ParameterSet, ValidationError};
pub use pipeline::{Pipeline, PipelineError, Step};
pub use registry::RegistryEntry;
pub use schema::{Choices, FieldDescriptor, Number, Schema};
pub use tone::{
    Binarization, BinarizationParams, Brightness, BrightnessParams, Contrast, ContrastParams,
    Negative, NegativeParams,
};
pub use types::{DynamicImage, Image, ImageError, Layout, Plane};
