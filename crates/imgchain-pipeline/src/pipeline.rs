//! Ordered sequence of operation steps applied to a source image.
//!
//! ```rust
//! # use imgchain_pipeline::{Image, Pipeline, PipelineError};
//! # use imgchain_pipeline::{Grayscale, GrayscaleParams, Sobel, SobelParams};
//! # fn run(source: Image) -> Result<Image, PipelineError> {
//! let mut pipeline = Pipeline::new(source);
//! pipeline
//!     .push(Grayscale, GrayscaleParams::default())
//!     .push(Sobel, SobelParams { threshold: 64 });
//! let edges = pipeline.execute()?;
//! # Ok(edges)
//! # }
//! ```
//!
//! Steps run in insertion order; each step validates its parameters
//! before transforming the previous step's output. The source image is
//! never modified, so [`Pipeline::execute`] can be called repeatedly.

use serde::Serialize;

use crate::diagnostics::{Clock, PipelineDiagnostics, StepDiagnostics};
use crate::operation::{Operation, OperationError, OperationKind, Params};
use crate::params::ParameterSet;
use crate::types::Image;

/// Errors raised while building or running a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// The parameters belong to a different operation kind.
    #[error("{operation} cannot be paired with {params} parameters")]
    TypeMismatch {
        /// The operation the step was meant to run.
        operation: OperationKind,
        /// The kind the supplied parameters belong to.
        params: OperationKind,
    },

    /// A step failed; later steps did not run.
    #[error("step {index} ({operation}) failed: {source}")]
    Step {
        /// Position of the failing step.
        index: usize,
        /// The failing step's operation.
        operation: OperationKind,
        /// What went wrong.
        source: OperationError,
    },
}

/// An operation paired with parameters of its own kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    operation: OperationKind,
    params: Params,
}

impl Step {
    /// Pair `operation` with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TypeMismatch`] if `params` belongs to a
    /// different kind.
    pub fn new(operation: OperationKind, params: Params) -> Result<Self, PipelineError> {
        if params.kind() != operation {
            return Err(PipelineError::TypeMismatch {
                operation,
                params: params.kind(),
            });
        }
        Ok(Self { operation, params })
    }

    /// Pair a concrete operation with its own parameter type.
    ///
    /// Cannot mismatch: the pairing is checked by the compiler.
    #[must_use]
    pub fn typed<O: Operation>(_operation: &O, params: O::Params) -> Self {
        Self {
            operation: <O::Params as ParameterSet>::KIND,
            params: params.into(),
        }
    }

    /// The operation this step runs.
    #[must_use]
    pub const fn operation(&self) -> OperationKind {
        self.operation
    }

    /// The step's parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Run this step on `image`.
    ///
    /// # Errors
    ///
    /// Returns whatever the operation's `apply` returns.
    pub fn apply(&self, image: &Image) -> Result<Image, OperationError> {
        self.operation.apply(image, &self.params)
    }
}

/// A source image and the ordered steps to apply to it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: Image,
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline over `source`.
    #[must_use]
    pub const fn new(source: Image) -> Self {
        Self {
            source,
            steps: Vec::new(),
        }
    }

    /// Append a step chosen at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TypeMismatch`] if `params` belongs to a
    /// different kind than `operation`. The step list is unchanged on
    /// error.
    pub fn add_step(
        &mut self,
        operation: OperationKind,
        params: Params,
    ) -> Result<&mut Self, PipelineError> {
        let step = Step::new(operation, params)?;
        self.steps.push(step);
        Ok(self)
    }

    /// Append a statically typed step.
    pub fn push<O: Operation>(&mut self, operation: O, params: O::Params) -> &mut Self {
        self.steps.push(Step::typed(&operation, params));
        self
    }

    /// Run every step in order and return the final image.
    ///
    /// An empty pipeline returns a copy of the source.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Step`] for the first step that fails.
    pub fn execute(&self) -> Result<Image, PipelineError> {
        let mut current = self.source.clone();
        for (index, step) in self.steps.iter().enumerate() {
            current = run_step(index, step, &current)?;
        }
        Ok(current)
    }

    /// Like [`execute`](Self::execute), also timing each step with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Step`] for the first step that fails.
    pub fn execute_with_diagnostics<C: Clock>(
        &self,
        clock: &C,
    ) -> Result<(Image, PipelineDiagnostics), PipelineError> {
        let start = clock.now();
        let mut current = self.source.clone();
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let step_start = clock.now();
            current = run_step(index, step, &current)?;
            steps.push(StepDiagnostics {
                index,
                operation: step.operation,
                duration: clock.elapsed(&step_start),
                output_shape: current.shape().to_vec(),
            });
        }

        let diagnostics = PipelineDiagnostics {
            source_shape: self.source.shape().to_vec(),
            steps,
            total_duration: clock.elapsed(&start),
        };
        Ok((current, diagnostics))
    }

    /// Remove every step. The source image is kept.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// The steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The source image.
    #[must_use]
    pub const fn source(&self) -> &Image {
        &self.source
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn run_step(index: usize, step: &Step, image: &Image) -> Result<Image, PipelineError> {
    tracing::debug!(
        index,
        operation = %step.operation,
        shape = ?image.shape(),
        "applying step"
    );
    step.apply(image).map_err(|source| PipelineError::Step {
        index,
        operation: step.operation,
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;
    use crate::convolution::{Gaussian, GaussianParams};
    use crate::params::ValidationError;
    use crate::tone::{Brightness, BrightnessParams, Negative, NegativeParams};

    fn source() -> Image {
        Image::gray(2, 2, vec![0.0, 50.0, 100.0, 200.0]).unwrap()
    }

    /// Advances 1ms every time it is read.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = Pipeline::new(source());
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.execute().unwrap(), source());
    }

    #[test]
    fn steps_run_in_order() {
        let mut pipeline = Pipeline::new(source());
        pipeline
            .push(Brightness, BrightnessParams { value: 100 })
            .push(Negative, NegativeParams);
        // Brightness clamps 200 -> 255 before Negative maps it to 0.
        let out = pipeline.execute().unwrap();
        assert_eq!(out.as_slice(), &[155.0, 105.0, 55.0, 0.0]);
    }

    #[test]
    fn execute_is_repeatable() {
        let mut pipeline = Pipeline::new(source());
        pipeline.push(Negative, NegativeParams);
        assert_eq!(pipeline.execute().unwrap(), pipeline.execute().unwrap());
        assert_eq!(pipeline.source(), &source());
    }

    #[test]
    fn add_step_rejects_mismatched_params() {
        let mut pipeline = Pipeline::new(source());
        let err = pipeline
            .add_step(
                OperationKind::Sobel,
                Params::from(GaussianParams::default()),
            )
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::TypeMismatch {
                operation: OperationKind::Sobel,
                params: OperationKind::Gaussian,
            }
        );
        assert!(pipeline.is_empty());
    }

    #[test]
    fn add_step_accepts_matching_params() {
        let mut pipeline = Pipeline::new(source());
        pipeline
            .add_step(
                OperationKind::Negative,
                Params::from(NegativeParams),
            )
            .unwrap();
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.steps()[0].operation(), OperationKind::Negative);
    }

    #[test]
    fn failing_step_reports_index_and_stops() {
        let mut pipeline = Pipeline::new(source());
        pipeline
            .push(Negative, NegativeParams)
            .push(
                Gaussian,
                GaussianParams {
                    kernel_size: 4,
                    sigma: 1.0,
                },
            )
            .push(Negative, NegativeParams);
        let err = pipeline.execute().unwrap_err();
        assert_eq!(
            err,
            PipelineError::Step {
                index: 1,
                operation: OperationKind::Gaussian,
                source: OperationError::InvalidParams(ValidationError::EvenKernelSize(4)),
            }
        );
        assert_eq!(
            err.to_string(),
            "step 1 (gaussian) failed: invalid parameters: kernel_size must be odd, got 4"
        );
    }

    #[test]
    fn clear_keeps_source() {
        let mut pipeline = Pipeline::new(source());
        pipeline.push(Negative, NegativeParams);
        pipeline.clear();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.execute().unwrap(), source());
    }

    #[test]
    fn diagnostics_time_each_step() {
        let mut pipeline = Pipeline::new(source());
        pipeline
            .push(Negative, NegativeParams)
            .push(Brightness, BrightnessParams { value: 1 });
        let clock = TickClock(Cell::new(0));
        let (image, diag) = pipeline.execute_with_diagnostics(&clock).unwrap();
        assert_eq!(image, pipeline.execute().unwrap());
        assert_eq!(diag.source_shape, vec![2, 2]);
        assert_eq!(diag.steps.len(), 2);
        assert_eq!(diag.steps[1].operation, OperationKind::Brightness);
        assert_eq!(diag.steps[0].duration, Duration::from_millis(1));
        // Reads: start=0, step0=1, step1=2; total elapsed at tick 3.
        assert_eq!(diag.total_duration, Duration::from_millis(3));
    }

    #[test]
    fn steps_serialize_with_operation_and_params() {
        let step = Step::typed(&Gaussian, GaussianParams::default());
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["operation"], "gaussian");
        assert_eq!(json["params"]["operation"], "gaussian");
        assert_eq!(json["params"]["params"]["sigma"], 1.0);
    }
}
