//! Convolution kernels and single-plane convolution.
//!
//! Kernel builders are pure functions of their parameter sets. They
//! validate the parameters themselves, so a kernel can never be built
//! from a size the formulas are undefined for (e.g. the sharpening
//! off-center weight `-1 / (k^2 - 1)` at `k = 1`).
//!
//! [`convolve`] uses true-convolution orientation (the kernel is flipped),
//! with the anchor at `(rows / 2, cols / 2)`. For a 2x2 kernel this puts
//! the anchor at the bottom-right cell, so the output at `(y, x)` reads
//! the input at `(y..=y+1, x..=x+1)`.

use serde::Serialize;

use crate::convolution::{AverageParams, GaussianParams, SharpeningParams};
use crate::params::{ParameterSet, ValidationError};
use crate::types::Plane;

/// A dense 2-D weight matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a kernel from nested rows.
    ///
    /// Returns `None` if `rows` is empty or ragged.
    #[must_use]
    pub fn from_rows<const C: usize>(rows: &[[f64; C]]) -> Option<Self> {
        if rows.is_empty() || C == 0 {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            cols: C,
            weights: rows.iter().flatten().copied().collect(),
        })
    }

    fn from_fn(size: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let weights = (0..size)
            .flat_map(|r| (0..size).map(move |c| (r, c)))
            .map(|(r, c)| f(r, c))
            .collect();
        Self {
            rows: size,
            cols: size,
            weights,
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Weight at `(row, col)`, or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.weights[row * self.cols + col])
    }

    /// All weights, row-major.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// The kernel rotated by 180 degrees.
    #[must_use]
    pub fn rotated_180(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            weights: self.weights.iter().rev().copied().collect(),
        }
    }
}

/// How samples outside the plane are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Boundary {
    /// Half-sample symmetric reflection: `d c b a | a b c d | d c b a`.
    Reflect,
    /// Samples outside the plane are 0.
    Zero,
}

impl Boundary {
    /// Map a possibly out-of-range coordinate onto `0..len`.
    ///
    /// Returns `None` when the sample should read as zero.
    fn resolve(self, index: i64, len: i64) -> Option<i64> {
        if (0..len).contains(&index) {
            return Some(index);
        }
        match self {
            Self::Zero => None,
            Self::Reflect => {
                let period = 2 * len;
                let m = index.rem_euclid(period);
                Some(if m < len { m } else { period - 1 - m })
            }
        }
    }
}

/// Convolve one plane with `kernel`.
///
/// `out[y][x] = sum over (r, c) of k[r][c] * in[y + rows/2 - r][x + cols/2 - c]`,
/// with out-of-range input coordinates resolved by `boundary`.
#[must_use]
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn convolve(plane: &Plane, kernel: &Kernel, boundary: Boundary) -> Plane {
    let (h, w) = (plane.height as i64, plane.width as i64);
    let (anchor_r, anchor_c) = ((kernel.rows / 2) as i64, (kernel.cols / 2) as i64);

    let mut out = Vec::with_capacity(plane.data.len());
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for r in 0..kernel.rows {
                let Some(sy) = boundary.resolve(y + anchor_r - r as i64, h) else {
                    continue;
                };
                let row = &plane.data[(sy * w) as usize..((sy + 1) * w) as usize];
                for c in 0..kernel.cols {
                    let Some(sx) = boundary.resolve(x + anchor_c - c as i64, w) else {
                        continue;
                    };
                    acc += kernel.weights[r * kernel.cols + c] * row[sx as usize];
                }
            }
            out.push(acc);
        }
    }

    Plane {
        height: plane.height,
        width: plane.width,
        data: out,
    }
}

/// Box kernel: `k x k` cells of `1 / k^2`.
///
/// # Errors
///
/// Returns the [`ValidationError`] of `params`.
pub fn average(params: &AverageParams) -> Result<Kernel, ValidationError> {
    params.validate()?;
    let size = params.kernel_size as usize;
    #[allow(clippy::cast_precision_loss)]
    let weight = 1.0 / (size * size) as f64;
    tracing::trace!(size, "built average kernel");
    Ok(Kernel::from_fn(size, |_, _| weight))
}

/// Gaussian kernel normalized to sum to 1.
///
/// Cell `(x, y)` starts as `exp(-((x - c)^2 + (y - c)^2) / (2 sigma^2))`
/// with `c = (k - 1) / 2`, then every cell is divided by the total. The
/// `1 / (2 pi sigma^2)` factor cancels in the division and is left out;
/// offsets are divided by `sigma` before squaring so extreme sigmas stay
/// finite.
///
/// # Errors
///
/// Returns the [`ValidationError`] of `params`.
pub fn gaussian(params: &GaussianParams) -> Result<Kernel, ValidationError> {
    params.validate()?;
    let size = params.kernel_size as usize;
    let sigma = params.sigma;
    #[allow(clippy::cast_precision_loss)]
    let center = (size - 1) as f64 / 2.0;

    #[allow(clippy::cast_precision_loss)]
    let raw = Kernel::from_fn(size, |r, c| {
        let dx = (c as f64 - center) / sigma;
        let dy = (r as f64 - center) / sigma;
        (-0.5 * dx.mul_add(dx, dy * dy)).exp()
    });
    let total = raw.sum();
    tracing::trace!(size, sigma = params.sigma, total, "built gaussian kernel");
    Ok(Kernel {
        weights: raw.weights.iter().map(|w| w / total).collect(),
        ..raw
    })
}

/// Sharpening kernel: center `1 + alpha`, every other cell `-1 / (k^2 - 1)`.
///
/// The off-center cells sum to -1, so the whole kernel sums to `alpha`.
///
/// # Errors
///
/// Returns the [`ValidationError`] of `params`; in particular
/// `kernel_size < 3` is rejected before the division.
pub fn sharpening(params: &SharpeningParams) -> Result<Kernel, ValidationError> {
    params.validate()?;
    let size = params.kernel_size as usize;
    debug_assert!(size >= 3);
    #[allow(clippy::cast_precision_loss)]
    let off_center = -1.0 / (size * size - 1) as f64;
    let mid = size / 2;
    tracing::trace!(size, alpha = params.alpha, "built sharpening kernel");
    Ok(Kernel::from_fn(size, |r, c| {
        if r == mid && c == mid {
            1.0 + params.alpha
        } else {
            off_center
        }
    }))
}

/// Horizontal Sobel kernel.
#[must_use]
pub fn sobel_x() -> Kernel {
    Kernel {
        rows: 3,
        cols: 3,
        weights: vec![-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0],
    }
}

/// Vertical Sobel kernel.
#[must_use]
pub fn sobel_y() -> Kernel {
    Kernel {
        rows: 3,
        cols: 3,
        weights: vec![1.0, 2.0, 1.0, 0.0, 0.0, 0.0, -1.0, -2.0, -1.0],
    }
}

/// Horizontal Roberts cross kernel.
#[must_use]
pub fn roberts_x() -> Kernel {
    Kernel {
        rows: 2,
        cols: 2,
        weights: vec![1.0, 0.0, 0.0, -1.0],
    }
}

/// Vertical Roberts cross kernel.
#[must_use]
pub fn roberts_y() -> Kernel {
    Kernel {
        rows: 2,
        cols: 2,
        weights: vec![0.0, 1.0, -1.0, 0.0],
    }
}
