use anyhow::{ensure, Context, Result};
use image::DynamicImage;
use ndarray::Array3;

use crate::pipeline::ColorMode;

/// The `Sample` struct represents one augmented image handed to the training loop.
///
/// Pixels are stored as a `[height, width, channels]` array of `f32` values in
/// the `[0, 255]` range. Grayscale samples keep an explicit channel axis of 1,
/// so every sample is three dimensional regardless of the color mode.
///
/// # Examples:
/// - Color sample at `image_size = 64`: shape `(64, 64, 3)`
/// - Grayscale sample at `image_size = 64`: shape `(64, 64, 1)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pixels: Array3<f32>,
}

impl Sample {
    /// Wraps an existing `[H, W, C]` pixel array.
    pub fn new(pixels: Array3<f32>) -> Self {
        Self { pixels }
    }

    /// Builds a `Sample` from an image, converting it to the requested color mode first.
    pub fn from_image(image: &DynamicImage, color_mode: ColorMode) -> Result<Self> {
        let (width, height, raw) = match color_mode {
            ColorMode::Color => {
                let rgb = image.to_rgb8();
                (rgb.width(), rgb.height(), rgb.into_raw())
            }
            ColorMode::Grayscale => {
                let luma = image.to_luma8();
                (luma.width(), luma.height(), luma.into_raw())
            }
        };
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );

        let values = raw.into_iter().map(f32::from).collect();
        let pixels = Array3::from_shape_vec(
            (height as usize, width as usize, color_mode.channels()),
            values,
        )
        .context("Failed to reshape image bytes into [H, W, C]")?;

        Ok(Self { pixels })
    }

    /// Returns `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.pixels.dim()
    }

    /// Total number of values in the sample.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &Array3<f32> {
        &self.pixels
    }

    pub fn into_pixels(self) -> Array3<f32> {
        self.pixels
    }
}

impl From<Array3<f32>> for Sample {
    fn from(pixels: Array3<f32>) -> Self {
        Self::new(pixels)
    }
}

#[cfg(test)]
mod sample_test {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_sample_from_rgb_image() -> Result<()> {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([10, 20, 30]));

        let sample = Sample::from_image(&DynamicImage::ImageRgb8(img), ColorMode::Color)?;

        assert_eq!(sample.shape(), (2, 3, 3));
        assert_eq!(sample.pixels()[[1, 2, 0]], 10.0);
        assert_eq!(sample.pixels()[[1, 2, 2]], 30.0);
        assert_eq!(sample.pixels()[[0, 0, 0]], 0.0);
        Ok(())
    }

    #[test]
    fn test_sample_grayscale_keeps_channel_axis() -> Result<()> {
        let mut img = GrayImage::new(4, 4);
        img.put_pixel(1, 3, Luma([200]));

        let sample = Sample::from_image(&DynamicImage::ImageLuma8(img), ColorMode::Grayscale)?;

        assert_eq!(sample.shape(), (4, 4, 1));
        assert_eq!(sample.pixels()[[3, 1, 0]], 200.0);
        Ok(())
    }

    #[test]
    fn test_sample_converts_color_to_grayscale() -> Result<()> {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let sample = Sample::from_image(&DynamicImage::ImageRgb8(img), ColorMode::Grayscale)?;

        assert_eq!(sample.shape(), (2, 2, 1));
        assert!(sample.pixels().iter().all(|&v| v == 255.0));
        Ok(())
    }
}
