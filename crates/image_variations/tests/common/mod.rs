#![allow(dead_code)]

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use image_variations::PipelineConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Deterministic, textured RGB image so crops and rotations actually change pixels.
pub fn pattern_image(width: u32, height: u32, seed: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(7) ^ y.wrapping_mul(13) ^ seed.wrapping_mul(31);
        Rgb([(v % 256) as u8, ((v >> 2) % 256) as u8, ((x + y + seed) % 256) as u8])
    }))
}

/// Writes `count` PNG files named `img_000.png`, `img_001.png`, ... into `dir`.
pub fn write_images(dir: &Path, count: usize, width: u32, height: u32) -> Result<Vec<PathBuf>> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("img_{:03}.png", i));
            pattern_image(width, height, i as u32).save(&path)?;
            Ok(path)
        })
        .collect()
}

/// Temporary input folder holding `count` images.
pub fn image_folder(count: usize, width: u32, height: u32) -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    write_images(dir.path(), count, width, height)?;
    Ok(dir)
}

/// Small, fast configuration reading from `input`.
pub fn small_config(input: &Path, batch_size: usize, num_workers: usize) -> PipelineConfig {
    PipelineConfig::builder()
        .input_folder(input)
        .image_size(16)
        .batch_size(batch_size)
        .num_workers(num_workers)
        .worker_timeout(Duration::from_millis(10))
        .timeout(Duration::from_secs(30))
        .build()
}
