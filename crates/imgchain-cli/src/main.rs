//! imgchain: command-line host for the imgchain operation pipeline.
//!
//! Lists the available operations, prints their parameter schemas, and
//! applies a chain of operations to an image file:
//!
//! ```text
//! imgchain list
//! imgchain schema gaussian
//! imgchain apply photo.png -o edges.png \
//!     --step grayscale:method=average \
//!     --step gaussian:kernel_size=5,sigma=1.4 \
//!     --step sobel:threshold=60 --diagnostics
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use imgchain_pipeline::analysis::{self, Histogram, ImageStats, Projections};
use imgchain_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use imgchain_pipeline::registry::{self, RegistryEntry};
use imgchain_pipeline::{Image, OperationError, OperationKind, ParamValue, ParamValues, Pipeline};
use serde::Serialize;
use serde::ser::Serializer;

/// Compose tone filters, convolutions, and edge detectors over images.
#[derive(Parser)]
#[command(name = "imgchain", version)]
struct Cli {
    /// Log debug events (one per executed step) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every operation identifier, one per line.
    List,

    /// Print parameter schemas as JSON.
    Schema {
        /// Operation identifier. Prints every schema when omitted.
        id: Option<String>,
    },

    /// Apply a chain of operations to an image file.
    Apply(ApplyArgs),
}

#[derive(clap::Args)]
struct ApplyArgs {
    /// Input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output image; the format follows the file extension.
    #[arg(long, short)]
    output: PathBuf,

    /// A step as `ID` or `ID:field=value,...`. Repeat for each step.
    #[arg(long = "step", value_name = "ID[:k=v,...]", value_parser = parse_step)]
    steps: Vec<StepArg>,

    /// Print per-step timing diagnostics.
    #[arg(long)]
    diagnostics: bool,

    /// Print statistics of the output image.
    #[arg(long)]
    stats: bool,

    /// Print the 256-bin histogram of each output channel.
    #[arg(long)]
    histogram: bool,

    /// Print row and column projections of the output image.
    #[arg(long)]
    projections: bool,

    /// Print diagnostics and analysis as JSON instead of text.
    #[arg(long)]
    json: bool,
}

/// A parsed `--step` argument.
#[derive(Debug, Clone, PartialEq)]
struct StepArg {
    kind: OperationKind,
    values: ParamValues,
}

/// Parse `ID` or `ID:field=value,field=value`.
fn parse_step(arg: &str) -> Result<StepArg, String> {
    let (id, fields) = arg.split_once(':').unwrap_or((arg, ""));
    let kind = id.trim().parse::<OperationKind>().map_err(|e| {
        let known: Vec<_> = OperationKind::ALL.iter().map(|k| k.id()).collect();
        format!("{e}; expected one of: {}", known.join(", "))
    })?;

    let mut values = ParamValues::new();
    for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let (name, raw) = field
            .split_once('=')
            .ok_or_else(|| format!("expected field=value, got {field:?}"))?;
        let Ok(value) = raw.parse::<ParamValue>();
        values.insert(name.trim(), value);
    }
    Ok(StepArg { kind, values })
}

/// Every registered schema as one ordered JSON object.
struct AllSchemas(&'static [RegistryEntry]);

impl Serialize for AllSchemas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|e| (e.id(), e.schema())))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| format!("Error serializing JSON: {e}"))?;
    println!("{json}");
    Ok(())
}

fn schema(id: Option<&str>) -> Result<(), String> {
    match id {
        Some(id) => {
            let entry = registry::lookup(id).ok_or_else(|| format!("Unknown operation {id:?}"))?;
            print_json(&entry.schema())
        }
        None => print_json(&AllSchemas(registry::entries())),
    }
}

fn build_pipeline(source: Image, steps: &[StepArg]) -> Result<Pipeline, String> {
    let mut pipeline = Pipeline::new(source);
    for (index, step) in steps.iter().enumerate() {
        let params = registry::build(step.kind, &step.values)
            .map_err(|e| format!("Invalid parameters for step {index} ({}): {e}", step.kind))?;
        pipeline
            .add_step(step.kind, params)
            .map_err(|e| e.to_string())?;
    }
    Ok(pipeline)
}

/// Everything `apply` reports besides the output file.
#[derive(Default, Serialize)]
struct ApplyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<PipelineDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<ImageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    histogram: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projections: Option<Projections>,
}

impl ApplyReport {
    const fn is_empty(&self) -> bool {
        self.diagnostics.is_none()
            && self.stats.is_none()
            && self.histogram.is_none()
            && self.projections.is_none()
    }

    /// Human-readable rendering, one section per requested report.
    fn text(&self) -> String {
        let mut sections = Vec::new();
        if let Some(diag) = &self.diagnostics {
            sections.push(diag.report());
        }
        if let Some(stats) = &self.stats {
            sections.push(format_stats(stats));
        }
        if let Some(histogram) = &self.histogram {
            sections.push(format_histogram(histogram));
        }
        if let Some(projections) = &self.projections {
            sections.push(format_projections(projections));
        }
        sections.join("\n")
    }
}

fn join_bins(bins: &[u32]) -> String {
    bins.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_sums(sums: &[f64]) -> String {
    sums.iter()
        .map(|v| format!("{v:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_histogram(histogram: &Histogram) -> String {
    histogram
        .channels
        .iter()
        .enumerate()
        .map(|(c, bins)| format!("Histogram channel {c}: {}", join_bins(bins)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_projections(projections: &Projections) -> String {
    format!(
        "Row projection: {}\nColumn projection: {}",
        join_sums(&projections.horizontal),
        join_sums(&projections.vertical),
    )
}

fn format_stats(stats: &ImageStats) -> String {
    format!(
        "Output: {}x{} ({} channel{})  min={:.2} max={:.2} mean={:.2}",
        stats.width,
        stats.height,
        stats.channels,
        if stats.channels == 1 { "" } else { "s" },
        stats.min,
        stats.max,
        stats.mean,
    )
}

fn apply(args: &ApplyArgs) -> Result<(), String> {
    let decoded = image::open(&args.input)
        .map_err(|e| format!("Error reading {}: {e}", args.input.display()))?;
    let source = Image::from_dynamic(&decoded);
    tracing::info!(path = %args.input.display(), shape = ?source.shape(), "decoded input");

    let pipeline = build_pipeline(source, &args.steps)?;
    let (result, diagnostics) = if args.diagnostics {
        let (image, diag) = pipeline
            .execute_with_diagnostics(&StdClock)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        (image, Some(diag))
    } else {
        let image = pipeline
            .execute()
            .map_err(|e| format!("Pipeline error: {e}"))?;
        (image, None)
    };

    let analysis_error = |e: OperationError| format!("Error analyzing output: {e}");
    let report = ApplyReport {
        diagnostics,
        stats: args
            .stats
            .then(|| analysis::stats(&result))
            .transpose()
            .map_err(analysis_error)?,
        histogram: args
            .histogram
            .then(|| analysis::histogram(&result))
            .transpose()
            .map_err(analysis_error)?,
        projections: args
            .projections
            .then(|| analysis::projections(&result))
            .transpose()
            .map_err(analysis_error)?,
    };

    result
        .to_dynamic()
        .map_err(|e| format!("Error converting output: {e}"))?
        .save(&args.output)
        .map_err(|e| format!("Error writing {}: {e}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), steps = pipeline.len(), "wrote output");

    if report.is_empty() {
        return Ok(());
    }
    if args.json {
        print_json(&report)
    } else {
        println!("{}", report.text());
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    let outcome = match &cli.command {
        Command::List => {
            for entry in registry::entries() {
                println!("{}", entry.id());
            }
            Ok(())
        }
        Command::Schema { id } => schema(id.as_deref()),
        Command::Apply(args) => apply(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
