use crate::pipeline::ColorMode;
use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::Result;
use image::DynamicImage;
use rand::rngs::StdRng;

// ============================================================================
// ToSample
// ============================================================================

/// Converts an image to a `[H, W, C]` f32 [`Sample`] with values in [0.0, 255.0].
///
/// Channel Handling
/// | Color mode  | Output Shape |
/// |-------------|--------------|
/// | `Grayscale` | `[H, W, 1]`  |
/// | `Color`     | `[H, W, 3]`  |
///
/// Images in any other layout are converted to the configured mode first.
#[derive(Debug, Clone)]
pub struct ToSample {
    color_mode: ColorMode,
}

impl ToSample {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }
}

impl Transform<DynamicImage, Sample> for ToSample {
    fn apply(&self, img: DynamicImage, _rng: &mut StdRng) -> Result<Sample> {
        Sample::from_image(&img, self.color_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::SeedableRng;

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 3);
        for x in 0..3 {
            for y in 0..3 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 85) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_to_sample() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let sample = ToSample::new(ColorMode::Color).apply(test_rgb_image(), &mut rng)?;
        assert_eq!(sample.shape(), (3, 3, 3)); // HWC format

        let max = sample.pixels().iter().cloned().fold(f32::MIN, f32::max);
        let min = sample.pixels().iter().cloned().fold(f32::MAX, f32::min);
        assert_eq!(max, 170.0);
        assert_eq!(min, 0.0);
        Ok(())
    }

    #[test]
    fn test_to_sample_grayscale() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let sample = ToSample::new(ColorMode::Grayscale).apply(test_rgb_image(), &mut rng)?;
        assert_eq!(sample.shape(), (3, 3, 1));
        Ok(())
    }
}
