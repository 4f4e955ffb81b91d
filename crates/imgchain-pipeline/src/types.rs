//! Shared types for the imgchain operation pipeline.
//!
//! [`Image`] is the single in-memory raster representation flowing
//! through every operation: a dense, row-major array of `f64` samples
//! with an explicit shape. Rank 2 (`H x W`) is grayscale, rank 3
//! (`H x W x C`) is multi-channel with channels interleaved per pixel.
//!
//! Samples are kept as `f64` between steps so intermediate results
//! (e.g. a sharpened image, or a grayscale image with `intensity > 1`)
//! are not truncated until the host exports the final image.

use serde::{Deserialize, Serialize};

/// Re-export `DynamicImage` so hosts can decode/encode without
/// depending on `image` directly.
pub use image::DynamicImage;

/// Re-export the 8-bit buffer types accepted by [`Image`]'s `From` impls.
pub use image::{GrayImage, RgbImage, RgbaImage};

/// A dense raster of `f64` samples with an explicit shape.
///
/// The shape is not restricted to rank 2 or 3 here: hosts may hand in
/// arbitrary arrays, and operations report
/// [`OperationError::Dimensionality`](crate::OperationError::Dimensionality)
/// for ranks they cannot process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImage")]
pub struct Image {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// Unchecked wire form of [`Image`]; deserialization goes through
/// [`Image::from_shape_vec`].
#[derive(Deserialize)]
struct RawImage {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<RawImage> for Image {
    type Error = ImageError;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        Self::from_shape_vec(raw.shape, raw.data)
    }
}

/// Height, width, and (for rank 3) channel count of a rank 2 or 3 image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Rows.
    pub height: usize,
    /// Columns.
    pub width: usize,
    /// `None` for a rank 2 image, `Some(c)` for rank 3.
    pub channels: Option<usize>,
}

impl Layout {
    /// Number of interleaved samples per pixel (1 for rank 2).
    #[must_use]
    pub fn samples_per_pixel(self) -> usize {
        self.channels.unwrap_or(1)
    }

    /// Number of pixels (`height * width`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.height * self.width
    }
}

/// One channel of an image, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Rows.
    pub height: usize,
    /// Columns.
    pub width: usize,
    /// `height * width` samples.
    pub data: Vec<f64>,
}

impl Plane {
    /// A plane filled with `value`.
    #[must_use]
    pub fn filled(height: usize, width: usize, value: f64) -> Self {
        Self {
            height,
            width,
            data: vec![value; height * width],
        }
    }

    /// Sample at row `y`, column `x`.
    ///
    /// # Panics
    ///
    /// Panics if `(y, x)` is out of bounds.
    #[must_use]
    pub fn get(&self, y: usize, x: usize) -> f64 {
        self.data[y * self.width + x]
    }
}

/// Errors raised when constructing or exporting an [`Image`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// The sample buffer length does not match the product of the shape.
    #[error("shape {shape:?} needs {expected} samples, got {actual}")]
    ShapeMismatch {
        /// Requested shape.
        shape: Vec<usize>,
        /// Product of the shape.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// The product of the shape overflows `usize`.
    #[error("shape {0:?} is too large")]
    Overflow(Vec<usize>),

    /// The image cannot be represented as an 8-bit raster buffer.
    #[error("cannot export image of shape {0:?} as an 8-bit raster")]
    UnsupportedExport(Vec<usize>),
}

impl Image {
    /// Build an image from an arbitrary shape and matching sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::ShapeMismatch`] if `data.len()` differs from
    /// the product of `shape`, or [`ImageError::Overflow`] if that
    /// product overflows.
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ImageError> {
        let expected = shape
            .iter()
            .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| ImageError::Overflow(shape.clone()))?;
        if expected != data.len() {
            return Err(ImageError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Build a rank 2 (grayscale) image.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::ShapeMismatch`] if `data.len() != height * width`.
    pub fn gray(height: usize, width: usize, data: Vec<f64>) -> Result<Self, ImageError> {
        Self::from_shape_vec(vec![height, width], data)
    }

    /// Build a rank 3 image with `channels` interleaved samples per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::ShapeMismatch`] if
    /// `data.len() != height * width * channels`.
    pub fn multi(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f64>,
    ) -> Result<Self, ImageError> {
        Self::from_shape_vec(vec![height, width, channels], data)
    }

    /// An image of the given shape with every sample set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Overflow`] if the shape's product overflows.
    pub fn filled(shape: Vec<usize>, value: f64) -> Result<Self, ImageError> {
        let len = shape
            .iter()
            .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| ImageError::Overflow(shape.clone()))?;
        Ok(Self {
            shape,
            data: vec![value; len],
        })
    }

    /// Build a rank 2 image by evaluating `f(y, x)` for each pixel.
    #[must_use]
    pub fn from_gray_fn(height: usize, width: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (y, x)))
            .map(|(y, x)| f(y, x))
            .collect();
        Self {
            shape: vec![height, width],
            data,
        }
    }

    /// The image shape (`[H, W]` or `[H, W, C]` for well-formed images).
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Height/width/channels, or `None` when the rank is neither 2 nor 3.
    #[must_use]
    pub fn layout(&self) -> Option<Layout> {
        match *self.shape.as_slice() {
            [height, width] => Some(Layout {
                height,
                width,
                channels: None,
            }),
            [height, width, channels] => Some(Layout {
                height,
                width,
                channels: Some(channels),
            }),
            _ => None,
        }
    }

    /// All samples in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume the image and return its sample buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Apply `f` to every sample, keeping the shape.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().copied().map(f).collect(),
        }
    }

    /// The samples of pixel `(y, x)`: one for rank 2, `C` for rank 3.
    ///
    /// Returns `None` for out-of-bounds coordinates or ranks other than
    /// 2 and 3.
    #[must_use]
    pub fn pixel(&self, y: usize, x: usize) -> Option<&[f64]> {
        let layout = self.layout()?;
        if y >= layout.height || x >= layout.width {
            return None;
        }
        let spp = layout.samples_per_pixel();
        let start = (y * layout.width + x) * spp;
        self.data.get(start..start + spp)
    }

    /// Split into one [`Plane`] per channel (a single plane for rank 2).
    pub(crate) fn planes(&self, layout: Layout) -> Vec<Plane> {
        let spp = layout.samples_per_pixel();
        (0..spp)
            .map(|c| Plane {
                height: layout.height,
                width: layout.width,
                data: self.data.iter().skip(c).step_by(spp).copied().collect(),
            })
            .collect()
    }

    /// Reassemble planes into an image with the given layout.
    ///
    /// Every plane must have `layout.height * layout.width` samples and
    /// there must be `layout.samples_per_pixel()` planes.
    pub(crate) fn from_planes(layout: Layout, planes: &[Plane]) -> Self {
        let spp = layout.samples_per_pixel();
        debug_assert_eq!(planes.len(), spp);
        let mut data = Vec::with_capacity(layout.pixel_count() * spp);
        for i in 0..layout.pixel_count() {
            data.extend(planes.iter().map(|p| p.data[i]));
        }
        let shape = match layout.channels {
            None => vec![layout.height, layout.width],
            Some(c) => vec![layout.height, layout.width, c],
        };
        Self { shape, data }
    }

    /// Copy a single plane into every channel of `layout`.
    pub(crate) fn broadcast(layout: Layout, plane: &Plane) -> Self {
        let spp = layout.samples_per_pixel();
        let data = plane
            .data
            .iter()
            .flat_map(|&v| std::iter::repeat_n(v, spp))
            .collect();
        let shape = match layout.channels {
            None => vec![layout.height, layout.width],
            Some(c) => vec![layout.height, layout.width, c],
        };
        Self { shape, data }
    }

    // ───────────────────── `image` crate boundary ─────────────────────

    /// Convert a decoded image into the pipeline representation.
    ///
    /// Grayscale sources become rank 2 images; everything else is
    /// converted to 8-bit RGB and becomes a rank 3 image with three
    /// channels.
    #[must_use]
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
                Self::from(&image.to_luma8())
            }
            _ => Self::from(&image.to_rgb8()),
        }
    }

    /// Export to an 8-bit [`DynamicImage`].
    ///
    /// Samples are rounded to the nearest integer and saturated into
    /// `[0, 255]`. Rank 2 images and rank 3 images with 1 channel become
    /// `Luma8`, 2 channels `LumaA8`, 3 channels `Rgb8`, 4 channels `Rgba8`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::UnsupportedExport`] for any other shape or
    /// when a dimension does not fit in `u32`.
    pub fn to_dynamic(&self) -> Result<DynamicImage, ImageError> {
        let unsupported = || ImageError::UnsupportedExport(self.shape.clone());
        let layout = self.layout().ok_or_else(unsupported)?;
        let width = u32::try_from(layout.width).map_err(|_| unsupported())?;
        let height = u32::try_from(layout.height).map_err(|_| unsupported())?;
        let raw: Vec<u8> = self.data.iter().copied().map(quantize).collect();

        let dynamic = match layout.channels {
            None | Some(1) => {
                image::GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
            }
            Some(2) => {
                image::GrayAlphaImage::from_raw(width, height, raw).map(DynamicImage::ImageLumaA8)
            }
            Some(3) => image::RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
            Some(4) => {
                image::RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8)
            }
            Some(_) => None,
        };
        dynamic.ok_or_else(unsupported)
    }

    /// Export as 8-bit grayscale.
    ///
    /// Multi-channel images are exported with [`to_dynamic`](Self::to_dynamic)
    /// and then reduced by the `image` crate's luma conversion.
    ///
    /// # Errors
    ///
    /// See [`to_dynamic`](Self::to_dynamic).
    pub fn to_gray8(&self) -> Result<GrayImage, ImageError> {
        Ok(self.to_dynamic()?.into_luma8())
    }

    /// Export as 8-bit RGB. Grayscale images are replicated into all
    /// three channels; alpha is dropped.
    ///
    /// # Errors
    ///
    /// See [`to_dynamic`](Self::to_dynamic).
    pub fn to_rgb8(&self) -> Result<RgbImage, ImageError> {
        Ok(self.to_dynamic()?.into_rgb8())
    }
}

/// Round and saturate a sample into the 8-bit range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn quantize(value: f64) -> u8 {
    // `as` saturates and maps NaN to 0.
    value.round().clamp(0.0, 255.0) as u8
}

impl From<&GrayImage> for Image {
    fn from(buffer: &GrayImage) -> Self {
        Self {
            shape: vec![buffer.height() as usize, buffer.width() as usize],
            data: buffer.as_raw().iter().map(|&v| f64::from(v)).collect(),
        }
    }
}

impl From<&RgbImage> for Image {
    fn from(buffer: &RgbImage) -> Self {
        Self {
            shape: vec![buffer.height() as usize, buffer.width() as usize, 3],
            data: buffer.as_raw().iter().map(|&v| f64::from(v)).collect(),
        }
    }
}

impl From<&RgbaImage> for Image {
    fn from(buffer: &RgbaImage) -> Self {
        Self {
            shape: vec![buffer.height() as usize, buffer.width() as usize, 4],
            data: buffer.as_raw().iter().map(|&v| f64::from(v)).collect(),
        }
    }
}
