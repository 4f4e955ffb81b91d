//! Read-only image measurements for hosts: histograms, intensity
//! projections, and summary statistics.
//!
//! None of these participate in a [`Pipeline`](crate::Pipeline); hosts
//! call them on a source or result image to drive plots and readouts.

use image::{DynamicImage, ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};

use crate::operation::{OperationError, layout_of};
use crate::types::Image;

/// 256-bin histograms of the 8-bit export, one per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    /// `channels[c][v]` counts samples of channel `c` equal to `v`.
    pub channels: Vec<Vec<u32>>,
}

impl Histogram {
    /// Total number of samples counted in channel `c`.
    #[must_use]
    pub fn total(&self, c: usize) -> u64 {
        self.channels
            .get(c)
            .map_or(0, |bins| bins.iter().map(|&n| u64::from(n)).sum())
    }
}

/// Per-pixel channel means summed along each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projections {
    /// One sum per row (length = height).
    pub horizontal: Vec<f64>,
    /// One sum per column (length = width).
    pub vertical: Vec<f64>,
}

/// Summary statistics over every sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Samples per pixel (1 for rank 2).
    pub channels: usize,
    /// Smallest sample (0 for an empty image).
    pub min: f64,
    /// Largest sample (0 for an empty image).
    pub max: f64,
    /// Mean sample (0 for an empty image).
    pub mean: f64,
}

fn channel_bins<P>(buffer: &ImageBuffer<P, Vec<u8>>) -> Vec<Vec<u32>>
where
    P: Pixel<Subpixel = u8>,
{
    imageproc::stats::histogram(buffer)
        .channels
        .into_iter()
        .map(|bins| bins.to_vec())
        .collect()
}

/// Histogram of the image as it would be exported (rounded, saturated
/// into `[0, 255]`).
///
/// # Errors
///
/// Returns [`OperationError::Dimensionality`] for ranks other than 2 and
/// 3, or [`OperationError::Image`] if the channel count cannot be
/// exported.
pub fn histogram(image: &Image) -> Result<Histogram, OperationError> {
    layout_of(image)?;
    let channels = match image.to_dynamic()? {
        DynamicImage::ImageLuma8(buf) => channel_bins(&buf),
        DynamicImage::ImageLumaA8(buf) => channel_bins(&buf),
        DynamicImage::ImageRgb8(buf) => channel_bins(&buf),
        other => channel_bins(&other.to_rgba8()),
    };
    Ok(Histogram { channels })
}

/// Row and column sums of the per-pixel channel mean.
///
/// # Errors
///
/// Returns [`OperationError::Dimensionality`] for ranks other than 2 and 3.
pub fn projections(image: &Image) -> Result<Projections, OperationError> {
    let layout = layout_of(image)?;
    let spp = layout.samples_per_pixel();
    let mut horizontal = vec![0.0; layout.height];
    let mut vertical = vec![0.0; layout.width];

    if spp > 0 {
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / spp as f64;
        for (i, px) in image.as_slice().chunks_exact(spp).enumerate() {
            let mean = px.iter().sum::<f64>() * scale;
            horizontal[i / layout.width] += mean;
            vertical[i % layout.width] += mean;
        }
    }

    Ok(Projections {
        horizontal,
        vertical,
    })
}

/// Dimensions plus min, max, and mean over every sample.
///
/// # Errors
///
/// Returns [`OperationError::Dimensionality`] for ranks other than 2 and 3.
pub fn stats(image: &Image) -> Result<ImageStats, OperationError> {
    let layout = layout_of(image)?;
    let samples = image.as_slice();

    let (min, max, mean) = if samples.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        (min, max, mean)
    };

    Ok(ImageStats {
        width: layout.width,
        height: layout.height,
        channels: layout.samples_per_pixel(),
        min,
        max,
        mean,
    })
}
