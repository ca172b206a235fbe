//! src/transforms/variation.rs
//!
//! The variation generator: one decoded image in, one augmented `Sample` out.
//!
//! Steps, in RNG draw order:
//!
//! ```text
//!   source ──► RandomScaleCrop ──► RandomRotation ──► RandomHorizontalFlip
//!                                                          │
//!   Sample ◄── ToSample ◄── Resize ◄── contrast ◄── saturation ◄── brightness
//!                                                  (color only)
//! ```
//!
//! The draw order is fixed, so a worker seeded identically produces identical
//! samples from identical sources.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use rand::rngs::StdRng;

use super::vision::{
    RandomEnhance, RandomHorizontalFlip, RandomRotation, RandomScaleCrop, Resize, ToSample,
};
use super::Transform;
use crate::pipeline::{ColorMode, PipelineConfig};
use crate::sample::Sample;

/// Produces `image_size × image_size` variations of source images.
pub struct VariationGenerator {
    crop: RandomScaleCrop,
    rest: Box<dyn Transform<DynamicImage, Sample>>,
    image_size: u32,
    color_mode: ColorMode,
}

impl VariationGenerator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let size = config.image_size;
        let mode = config.color_mode;

        let crop = RandomScaleCrop::new(size)?;
        let rotation = RandomRotation::new(config.max_rotation)?;
        let flip = RandomHorizontalFlip::new(config.flip_probability)?;
        let brightness = RandomEnhance::brightness(config.brightness_range)?;
        let contrast = RandomEnhance::contrast(config.contrast_range)?;
        let resize = Resize::square(size, FilterType::Lanczos3)?;
        let to_sample = ToSample::new(mode);

        let rest: Box<dyn Transform<DynamicImage, Sample>> = match mode {
            ColorMode::Color => {
                let saturation = RandomEnhance::saturation(config.saturation_range)?;
                Box::new(
                    rotation
                        .then(flip)
                        .then(brightness)
                        .then(saturation)
                        .then(contrast)
                        .then(resize)
                        .then(to_sample),
                )
            }
            ColorMode::Grayscale => Box::new(
                rotation
                    .then(flip)
                    .then(brightness)
                    .then(contrast)
                    .then(resize)
                    .then(to_sample),
            ),
        };

        Ok(Self {
            crop,
            rest,
            image_size: size,
            color_mode: mode,
        })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Produces one variation of `image`.
    ///
    /// Fails if the source is too small to crop (short side below 2 pixels).
    pub fn generate(&self, image: &DynamicImage, rng: &mut StdRng) -> Result<Sample> {
        let cropped = self
            .crop
            .apply(image, rng)
            .context("Failed to crop source image")?;
        self.rest.apply(cropped, rng)
    }
}

impl std::fmt::Debug for VariationGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariationGenerator")
            .field("crop", &self.crop)
            .field("image_size", &self.image_size)
            .field("color_mode", &self.color_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::SeedableRng;

    fn noisy_image(width: u32, height: u32, seed: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let v = x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed;
            *pixel = Rgb([(v % 256) as u8, ((v / 3) % 256) as u8, ((v / 7) % 256) as u8]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_output_shape_for_every_policy() -> Result<()> {
        let config = PipelineConfig::builder().image_size(32).build();
        let generator = VariationGenerator::new(&config)?;
        let mut rng = StdRng::seed_from_u64(3);

        // Large, Mid and Tiny crop policies, plus a non-square source
        for (w, h) in [(60, 60), (100, 100), (200, 200), (240, 130)] {
            let img = noisy_image(w, h, 1);
            for _ in 0..5 {
                let sample = generator.generate(&img, &mut rng)?;
                assert_eq!(sample.shape(), (32, 32, 3));
                assert!(sample.pixels().iter().all(|&v| (0.0..=255.0).contains(&v)));
            }
        }
        Ok(())
    }

    #[test]
    fn test_grayscale_output_shape() -> Result<()> {
        let config = PipelineConfig::builder()
            .image_size(16)
            .color_mode(ColorMode::Grayscale)
            .build();
        let generator = VariationGenerator::new(&config)?;
        let mut rng = StdRng::seed_from_u64(3);

        let img = ColorMode::Grayscale.convert(noisy_image(80, 90, 2));
        let sample = generator.generate(&img, &mut rng)?;
        assert_eq!(sample.shape(), (16, 16, 1));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_variation() -> Result<()> {
        let config = PipelineConfig::builder().image_size(24).build();
        let generator = VariationGenerator::new(&config)?;
        let img = noisy_image(120, 100, 5);

        let a = generator.generate(&img, &mut StdRng::seed_from_u64(99))?;
        let b = generator.generate(&img, &mut StdRng::seed_from_u64(99))?;
        let c = generator.generate(&img, &mut StdRng::seed_from_u64(100))?;

        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }

    #[test]
    fn test_small_source_is_upscaled() -> Result<()> {
        let config = PipelineConfig::builder().image_size(64).build();
        let generator = VariationGenerator::new(&config)?;
        let mut rng = StdRng::seed_from_u64(8);

        let sample = generator.generate(&noisy_image(10, 12, 0), &mut rng)?;
        assert_eq!(sample.shape(), (64, 64, 3));
        Ok(())
    }

    #[test]
    fn test_degenerate_source_fails() -> Result<()> {
        let config = PipelineConfig::builder().image_size(8).build();
        let generator = VariationGenerator::new(&config)?;
        let mut rng = StdRng::seed_from_u64(8);

        assert!(generator.generate(&noisy_image(1, 40, 0), &mut rng).is_err());
        Ok(())
    }
}
