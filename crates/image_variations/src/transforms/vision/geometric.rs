use crate::pipeline::uniform;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::SQRT_2;

// ============================================================================
// RandomScaleCrop
// ============================================================================

/// Extra room kept around the target size so a crop survives a worst-case
/// 45° rotation and crop-back with at least `image_size` pixels per side.
pub fn rotation_margin(image_size: u32) -> f64 {
    SQRT_2 * f64::from(image_size) * 1.1
}

/// How the crop fraction is drawn, chosen from the source's short side.
///
/// The `Mid` bounds are `uniform(min_dim, min_dim - margin)`, i.e. inverted.
/// That is kept as is: it biases crops towards the full short side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropScalePolicy {
    /// `margin * 3 < min_dim`: crop 30-70% of the short side
    Tiny,
    /// `margin * 2 < min_dim`: fraction in `[(min_dim - margin) / min_dim, 1]`
    Mid,
    /// Otherwise: fraction in `[margin / min_dim, 1]`
    Large,
}

impl CropScalePolicy {
    pub fn select(min_dim: f64, margin: f64) -> Self {
        if margin * 3.0 < min_dim {
            CropScalePolicy::Tiny
        } else if margin * 2.0 < min_dim {
            CropScalePolicy::Mid
        } else {
            CropScalePolicy::Large
        }
    }

    /// Draws the crop fraction of the short side.
    pub fn sample_fraction(self, rng: &mut StdRng, min_dim: f64, margin: f64) -> f64 {
        match self {
            CropScalePolicy::Tiny => uniform(rng, 0.3, 0.7),
            CropScalePolicy::Mid => uniform(rng, min_dim, min_dim - margin) / min_dim,
            CropScalePolicy::Large => uniform(rng, margin, min_dim) / min_dim,
        }
    }
}

/// Square crop box picked by [`RandomScaleCrop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Cuts a random square out of the source whose side depends on how much
/// larger the source is than the target size.
///
/// The side is clamped into `[1, min_dim - 1]` so a position can always be drawn.
#[derive(Debug, Clone)]
pub struct RandomScaleCrop {
    image_size: u32,
}

impl RandomScaleCrop {
    pub fn new(image_size: u32) -> Result<Self> {
        ensure!(image_size > 0, "Target image size must be positive");
        Ok(Self { image_size })
    }

    /// Draws a crop box for a `width × height` source.
    pub fn sample_box(&self, width: u32, height: u32, rng: &mut StdRng) -> Result<CropBox> {
        let min_side = width.min(height);
        ensure!(
            min_side >= 2,
            "Source image is too small to crop (got {}x{})",
            width,
            height
        );

        let min_dim = f64::from(min_side);
        let margin = rotation_margin(self.image_size);
        let fraction = CropScalePolicy::select(min_dim, margin).sample_fraction(rng, min_dim, margin);

        let raw_size = rng.random::<f64>() * min_dim * (1.0 - fraction) + min_dim * fraction;
        let size = (raw_size as u32).clamp(1, min_side - 1);

        let x = rng.random_range(0..width - size);
        let y = rng.random_range(0..height - size);
        Ok(CropBox { x, y, size })
    }
}

impl<'a> Transform<&'a DynamicImage, DynamicImage> for RandomScaleCrop {
    fn apply(&self, img: &'a DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        let crop = self.sample_box(width, height, rng)?;
        Ok(img.crop_imm(crop.x, crop.y, crop.size, crop.size))
    }
}

// ============================================================================
// RandomRotation
// ============================================================================

/// Rotates a square crop by a whole number of degrees drawn from
/// `[-max_degrees, max_degrees]`, then keeps the central square of side
/// `side / sqrt(2)`.
///
/// The kept square is inscribed in the rotated content for any angle, so no
/// fill pixels reach the output.
#[derive(Debug, Clone)]
pub struct RandomRotation {
    max_degrees: u32,
}

impl RandomRotation {
    pub fn new(max_degrees: u32) -> Result<Self> {
        ensure!(
            max_degrees <= 180,
            "Rotation must be at most 180 degrees (got {})",
            max_degrees
        );
        Ok(Self { max_degrees })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomRotation {
    fn apply(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        let side = img.width().min(img.height());
        let reduced = (f64::from(side) / SQRT_2) as u32;
        ensure!(
            reduced > 0,
            "Crop of side {} is too small to rotate and crop back",
            side
        );
        let offset = (side - reduced) / 2;

        let max = self.max_degrees as i32;
        let degrees = rng.random_range(-max..=max);

        let rotated = rotate_about_center(img, degrees as f32)?;
        Ok(rotated.crop_imm(offset, offset, reduced, reduced))
    }
}

/// Rotates counter-clockwise about the image centre on the same canvas,
/// bilinear sampling, black outside the source.
pub fn rotate_about_center(img: DynamicImage, degrees: f32) -> Result<DynamicImage> {
    let (width, height) = img.dimensions();
    if degrees == 0.0 || width == 0 || height == 0 {
        return Ok(img);
    }
    Ok(match img {
        DynamicImage::ImageLuma8(gray) => {
            let raw = rotate_raw(gray.as_raw(), width, height, 1, degrees);
            DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, raw).context("Rotated buffer size mismatch")?,
            )
        }
        other => {
            let rgb = other.to_rgb8();
            let raw = rotate_raw(rgb.as_raw(), width, height, 3, degrees);
            DynamicImage::ImageRgb8(
                RgbImage::from_raw(width, height, raw).context("Rotated buffer size mismatch")?,
            )
        }
    })
}

fn rotate_raw(src: &[u8], width: u32, height: u32, channels: usize, degrees: f32) -> Vec<u8> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let stride = width as usize * channels;
    let mut out = vec![0u8; src.len()];

    for y in 0..height {
        for x in 0..width {
            // Pixel centres, rotated back into the source
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let src_x = cx + dx * cos - dy * sin - 0.5;
            let src_y = cy + dx * sin + dy * cos - 0.5;

            // Within half a pixel of the border the edge pixel is reused
            if src_x < -0.5 || src_y < -0.5 || src_x > max_x + 0.5 || src_y > max_y + 0.5 {
                continue;
            }
            let src_x = src_x.clamp(0.0, max_x);
            let src_y = src_y.clamp(0.0, max_y);

            let x0 = src_x.floor() as usize;
            let y0 = src_y.floor() as usize;
            let x1 = (x0 + 1).min(width as usize - 1);
            let y1 = (y0 + 1).min(height as usize - 1);
            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;

            let dst = y as usize * stride + x as usize * channels;
            for c in 0..channels {
                let at = |px: usize, py: usize| f32::from(src[py * stride + px * channels + c]);
                let v = at(x0, y0) * (1.0 - fx) * (1.0 - fy)
                    + at(x1, y0) * fx * (1.0 - fy)
                    + at(x0, y1) * (1.0 - fx) * fy
                    + at(x1, y1) * fx * fy;
                out[dst + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

// ============================================================================
// Resize
// ============================================================================

/// Resizes an image to exactly `width × height`, ignoring aspect ratio.
/// Users must specify the filter type.
///
/// # Filter Types
/// - `Nearest`: Nearest neighbour, fastest
/// - `Triangle`: Bilinear filter, good all-round default
/// - `CatmullRom`: Bicubic sharpening
/// - `Gaussian`: Blurring/smoothing
/// - `Lanczos3`: Lanczos with window 3, highest quality re-sampling but slowest.
///
/// # Examples
/// ``` ignore
/// # use image::imageops::FilterType;
/// let resize = Resize::square(64, FilterType::Lanczos3)?;
/// let resized = resize.apply(img, &mut rng)?;
/// ```
#[derive(Debug)]
pub struct Resize {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Resize {
    /// Creates a new Resize transform.
    pub fn new(width: u32, height: u32, filter: FilterType) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive after resizing (got {}x{})",
            width,
            height
        );
        Ok(Self {
            width,
            height,
            filter,
        })
    }

    pub fn square(side: u32, filter: FilterType) -> Result<Self> {
        Self::new(side, side, filter)
    }
}

impl Transform<DynamicImage, DynamicImage> for Resize {
    fn apply(&self, img: DynamicImage, _rng: &mut StdRng) -> Result<DynamicImage> {
        if img.dimensions() == (self.width, self.height) {
            return Ok(img);
        }
        Ok(img.resize_exact(self.width, self.height, self.filter))
    }
}
