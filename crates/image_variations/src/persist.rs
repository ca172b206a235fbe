//! src/persist.rs
//!
//! Writes samples back to disk as PNG files, mostly for eyeballing what the
//! network is fed.

use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::pipeline::ColorMode;
use crate::sample::Sample;

/// Subtracted from the Unix time to build the file name prefix.
pub const EPOCH_OFFSET: u64 = 1_490_000_000;

/// Name used when the caller does not give one.
pub const DEFAULT_NAME: &str = "test";

/// Saves `sample` as `<unix_time - EPOCH_OFFSET>_<name>.png` in `output_folder`.
///
/// The folder is created if needed. Pixel values are rounded and clamped to
/// `[0, 255]`. Returns the path of the written file.
///
/// Files written within the same second with the same name overwrite each other.
///
/// # Errors
/// - `sample` does not hold exactly `image_size × image_size × channels` values
/// - The folder cannot be created or the file cannot be written
pub fn save_sample(
    sample: &Sample,
    image_size: u32,
    color_mode: ColorMode,
    output_folder: &Path,
    name: Option<&str>,
) -> Result<PathBuf> {
    let channels = color_mode.channels();
    let side = image_size as usize;
    let expected = side * side * channels;
    ensure!(
        sample.len() == expected,
        "Sample has {} values, expected {} ({}x{}x{})",
        sample.len(),
        expected,
        image_size,
        image_size,
        channels
    );

    // `iter` walks the logical [H, W, C] order: interleaved rows, as `image` expects.
    let raw: Vec<u8> = sample
        .pixels()
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();

    let image = match color_mode {
        ColorMode::Color => DynamicImage::ImageRgb8(
            RgbImage::from_raw(image_size, image_size, raw)
                .context("Sample buffer does not fit an RGB image")?,
        ),
        ColorMode::Grayscale => DynamicImage::ImageLuma8(
            GrayImage::from_raw(image_size, image_size, raw)
                .context("Sample buffer does not fit a grayscale image")?,
        ),
    };

    fs::create_dir_all(output_folder).with_context(|| {
        format!(
            "Failed to create output folder {}",
            output_folder.display()
        )
    })?;

    let path = output_folder.join(file_name(name)?);
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(path = %path.display(), "saved sample");
    Ok(path)
}

fn file_name(name: Option<&str>) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_secs();
    let stamp = now.saturating_sub(EPOCH_OFFSET);
    Ok(format!("{}_{}.png", stamp, name.unwrap_or(DEFAULT_NAME)))
}
