use crate::pipeline::uniform;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use rand::rngs::StdRng;

/// Factors closer to 1.0 than this are skipped; the result would be visually identical.
pub const IDENTITY_TOLERANCE: f64 = 0.05;

// ============================================================================
// Enhancement
// ============================================================================

/// Photometric adjustment, expressed as a blend between the image and a
/// degenerate version of it:
///
/// ```text
/// output = degenerate + factor * (input - degenerate)
/// ```
///
/// | Enhancement  | Degenerate image                  |
/// |--------------|-----------------------------------|
/// | `Brightness` | black                             |
/// | `Saturation` | per-pixel ITU-R 601 luma          |
/// | `Contrast`   | uniform image at the mean luma    |
///
/// A factor of 1.0 returns the input unchanged. Single-channel images are
/// left untouched by `Saturation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enhancement {
    Brightness,
    Saturation,
    Contrast,
}

impl Enhancement {
    /// Applies the enhancement with a fixed factor.
    pub fn enhance(self, img: DynamicImage, factor: f64) -> Result<DynamicImage> {
        let factor = factor as f32;
        Ok(match img {
            DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                let mut raw = gray.into_raw();
                match self {
                    Enhancement::Brightness => blend_towards(&mut raw, 1, factor, |_| 0.0),
                    Enhancement::Saturation => {}
                    Enhancement::Contrast => {
                        let mean = mean_luma(&raw, 1);
                        blend_towards(&mut raw, 1, factor, |_| mean);
                    }
                }
                DynamicImage::ImageLuma8(
                    GrayImage::from_raw(width, height, raw).context("Enhanced buffer size mismatch")?,
                )
            }
            other => {
                let rgb = other.to_rgb8();
                let (width, height) = rgb.dimensions();
                let mut raw = rgb.into_raw();
                match self {
                    Enhancement::Brightness => blend_towards(&mut raw, 3, factor, |_| 0.0),
                    Enhancement::Saturation => blend_towards(&mut raw, 3, factor, luma),
                    Enhancement::Contrast => {
                        let mean = mean_luma(&raw, 3);
                        blend_towards(&mut raw, 3, factor, |_| mean);
                    }
                }
                DynamicImage::ImageRgb8(
                    RgbImage::from_raw(width, height, raw).context("Enhanced buffer size mismatch")?,
                )
            }
        })
    }
}

/// Rounded ITU-R 601-2 luma of one pixel (identity for single-channel pixels).
fn luma(pixel: &[u8]) -> f32 {
    match pixel {
        [r, g, b, ..] => {
            (0.299 * f32::from(*r) + 0.587 * f32::from(*g) + 0.114 * f32::from(*b)).round()
        }
        [v, ..] => f32::from(*v),
        [] => 0.0,
    }
}

/// Mean luma over the whole image, rounded to an integer level.
fn mean_luma(raw: &[u8], channels: usize) -> f32 {
    let count = raw.len() / channels;
    if count == 0 {
        return 0.0;
    }
    let sum: f64 = raw.chunks_exact(channels).map(|p| f64::from(luma(p))).sum();
    (sum / count as f64 + 0.5).floor() as f32
}

fn blend_towards<F>(raw: &mut [u8], channels: usize, factor: f32, degenerate: F)
where
    F: Fn(&[u8]) -> f32,
{
    for pixel in raw.chunks_exact_mut(channels) {
        let base = degenerate(pixel);
        for value in pixel.iter_mut() {
            let blended = base + factor * (f32::from(*value) - base);
            *value = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

// ============================================================================
// RandomEnhance
// ============================================================================

/// Randomly applies an [`Enhancement`] with a factor drawn uniformly from `range`.
///
/// The factor is always drawn, but the image is only touched when the factor
/// is more than [`IDENTITY_TOLERANCE`] away from 1.0.
///
/// # Example
/// ```ignore
/// let jitter = RandomEnhance::brightness((0.7, 1.1))?
///     .then(RandomEnhance::contrast((0.8, 1.2))?);
/// let varied = jitter.apply(image, &mut rng)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomEnhance {
    enhancement: Enhancement,
    range: (f64, f64),
}

impl RandomEnhance {
    pub fn new(enhancement: Enhancement, range: (f64, f64)) -> Result<Self> {
        let (low, high) = range;
        ensure!(
            low.is_finite() && high.is_finite() && low >= 0.0 && low <= high,
            "{:?} range must satisfy 0 <= low <= high (got {}..{})",
            enhancement,
            low,
            high
        );
        Ok(Self { enhancement, range })
    }

    pub fn brightness(range: (f64, f64)) -> Result<Self> {
        Self::new(Enhancement::Brightness, range)
    }

    pub fn saturation(range: (f64, f64)) -> Result<Self> {
        Self::new(Enhancement::Saturation, range)
    }

    pub fn contrast(range: (f64, f64)) -> Result<Self> {
        Self::new(Enhancement::Contrast, range)
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomEnhance {
    fn apply(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        let factor = uniform(rng, self.range.0, self.range.1);
        if (factor - 1.0).abs() <= IDENTITY_TOLERANCE {
            return Ok(img);
        }
        self.enhancement.enhance(img, factor)
    }
}
