use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::Rng;

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Randomly mirrors images left-right.
///
/// One value is drawn from the RNG per call, whatever `p` is, so the draw
/// sequence of later transforms does not depend on the flip probability.
///
/// # Example
/// ```ignore
/// let flip = RandomHorizontalFlip::new(0.5)?; // 50% flip chance
/// let augmented = flip.apply(image, &mut rng)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        Ok(Self { p })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomHorizontalFlip {
    fn apply(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        Ok(if rng.random::<f64>() < self.p {
            img.fliph()
        } else {
            img
        })
    }
}
