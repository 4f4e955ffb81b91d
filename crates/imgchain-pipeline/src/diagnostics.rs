//! Pipeline diagnostics: per-step timing and output shapes.
//!
//! Collected by
//! [`Pipeline::execute_with_diagnostics`](crate::Pipeline::execute_with_diagnostics).
//! The core never reads a system clock itself; the caller supplies a
//! [`Clock`], so the crate stays usable where `std::time::Instant` is
//! unavailable and tests can use a deterministic clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::operation::OperationKind;

/// A monotonic time source.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Shape of the source image.
    pub source_shape: Vec<usize>,
    /// One entry per executed step, in order.
    pub steps: Vec<StepDiagnostics>,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// Position in the pipeline.
    pub index: usize,
    /// The operation that ran.
    pub operation: OperationKind,
    /// Wall-clock duration of the step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Shape of the step's output image.
    pub output_shape: Vec<usize>,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Source: {}", format_shape(&self.source_shape)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<4} {:<14} {:>10} {:>10}  {}",
            "#", "Operation", "Duration", "% Total", "Output"
        ));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration);
        for step in &self.steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<4} {:<14} {ms:>8.3}ms {pct:>9.1}%  {}",
                step.index,
                step.operation.id(),
                format_shape(&step.output_shape),
            ));
        }

        if self.steps.is_empty() {
            lines.push("(no steps)".to_owned());
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// `[480, 640, 3]` -> `480x640x3`.
fn format_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("x")
}
