//! src/pipeline/config.rs
//!
//! Configuration for the augmentation pipeline.
//!
//! `PipelineConfig` holds every construction-time parameter: where images come
//! from, how they are varied, and how the worker pool is sized. Nothing here can
//! be changed once the pipeline is running.
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .input_folder("data/faces")
//!     .image_size(64)
//!     .batch_size(32)
//!     .color_mode(ColorMode::Grayscale)
//!     .source_mode(SourceMode::Streaming)
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `source_mode`: `InMemory` decodes every file once and keeps it; `Streaming`
//!   re-decodes a file on every draw, trading CPU/I-O for memory.
//! - `num_workers`: defaults to the CPU count; more workers than files is pointless
//!   and gets capped at construction.
//! - `batch_size`: also sets the queue high-water mark (`3 × batch_size`).

use anyhow::{ensure, Result};
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Duration;

/// Queue depth, in batches, above which workers stop producing.
pub const HIGH_WATER_FACTOR: usize = 3;

/// Worker count used when the CPU count cannot be detected.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Extensions picked up from the input folder when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// Pixel layout of the produced samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Three channel RGB
    #[default]
    Color,
    /// Single channel luma
    Grayscale,
}

impl ColorMode {
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Color => 3,
            ColorMode::Grayscale => 1,
        }
    }

    /// Converts a decoded image into the 8-bit layout of this mode.
    pub fn convert(self, image: DynamicImage) -> DynamicImage {
        match (self, image) {
            (ColorMode::Color, img @ DynamicImage::ImageRgb8(_)) => img,
            (ColorMode::Grayscale, img @ DynamicImage::ImageLuma8(_)) => img,
            (ColorMode::Color, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
            (ColorMode::Grayscale, img) => DynamicImage::ImageLuma8(img.to_luma8()),
        }
    }
}

/// Where worker threads get their source images from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Decode each worker's shard once and sample from memory
    #[default]
    InMemory,
    /// Keep only file paths and decode a file on every draw
    Streaming,
}

/// Configuration for the augmentation pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Folder the source images are read from
    pub input_folder: PathBuf,
    /// Folder `save_sample` writes to
    pub output_folder: PathBuf,
    /// Side length of the produced square samples
    pub image_size: u32,
    /// Default number of samples per batch; also drives the high-water mark
    pub batch_size: usize,
    pub color_mode: ColorMode,
    pub source_mode: SourceMode,
    /// Maximum rotation in whole degrees, applied in both directions
    pub max_rotation: u32,
    /// Probability of a left-right mirror
    pub flip_probability: f64,
    pub brightness_range: (f64, f64),
    pub saturation_range: (f64, f64),
    pub contrast_range: (f64, f64),
    /// Number of worker threads (`None` = CPU count)
    pub num_workers: Option<usize>,
    /// Base seed for the worker RNGs (`None` = random)
    pub seed: Option<u64>,
    /// Maximum wait per sample in `get_batch`. `None` blocks until workers deliver.
    pub timeout: Option<Duration>,
    /// How often paused workers re-check the shutdown flag. Default: 100ms.
    pub worker_timeout: Duration,
    /// Consecutive failed draws after which a worker gives up
    pub max_consecutive_failures: usize,
    /// File extensions accepted from the input folder (case-insensitive)
    pub extensions: Vec<String>,
    /// Whether to scan the input folder recursively
    pub recursive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("data/input"),
            output_folder: PathBuf::from("data/output"),
            image_size: 64,
            batch_size: 16,
            color_mode: ColorMode::Color,
            source_mode: SourceMode::InMemory,
            max_rotation: 30,
            flip_probability: 0.5,
            brightness_range: (0.7, 1.1),
            saturation_range: (0.7, 1.0),
            contrast_range: (0.8, 1.2),
            num_workers: None,
            seed: None,
            timeout: None,
            worker_timeout: Duration::from_millis(100),
            max_consecutive_failures: 16,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: false,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Queue depth at which workers pause.
    pub fn high_water_mark(&self) -> usize {
        self.batch_size * HIGH_WATER_FACTOR
    }

    /// Configured worker count, falling back to the number of CPUs.
    pub fn resolved_num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(|| match num_cpus::get() {
            0 => DEFAULT_NUM_WORKERS,
            n => n,
        })
    }

    /// Checks every parameter the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.image_size > 0, "Image size must be greater than 0");
        ensure!(self.batch_size > 0, "Batch size must be greater than 0");
        if let Some(workers) = self.num_workers {
            ensure!(workers > 0, "Number of workers must be greater than 0");
        }
        ensure!(
            self.max_rotation <= 180,
            "Maximum rotation must be at most 180 degrees (got {})",
            self.max_rotation
        );
        ensure!(
            (0.0..=1.0).contains(&self.flip_probability),
            "Flip probability must be in [0.0, 1.0] range (got {})",
            self.flip_probability
        );
        ensure!(
            self.max_consecutive_failures > 0,
            "max_consecutive_failures must be greater than 0"
        );
        ensure!(
            !self.worker_timeout.is_zero(),
            "Worker polling interval must be non-zero"
        );
        ensure!(!self.extensions.is_empty(), "At least one file extension is required");

        for (name, (low, high)) in [
            ("Brightness", self.brightness_range),
            ("Saturation", self.saturation_range),
            ("Contrast", self.contrast_range),
        ] {
            ensure!(
                low.is_finite() && high.is_finite() && low >= 0.0 && low <= high,
                "{} range must satisfy 0 <= low <= high (got {}..{})",
                name,
                low,
                high
            );
        }
        Ok(())
    }
}

/// Builder for PipelineConfig with method chaining
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn input_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.input_folder = folder.into();
        self
    }

    pub fn output_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.output_folder = folder.into();
        self
    }

    /// Set the side length of produced samples (must be > 0)
    pub fn image_size(mut self, size: u32) -> Self {
        self.config.image_size = size;
        self
    }

    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.config.color_mode = mode;
        self
    }

    pub fn source_mode(mut self, mode: SourceMode) -> Self {
        self.config.source_mode = mode;
        self
    }

    pub fn max_rotation(mut self, degrees: u32) -> Self {
        self.config.max_rotation = degrees;
        self
    }

    pub fn flip_probability(mut self, p: f64) -> Self {
        self.config.flip_probability = p;
        self
    }

    pub fn brightness_range(mut self, low: f64, high: f64) -> Self {
        self.config.brightness_range = (low, high);
        self
    }

    pub fn saturation_range(mut self, low: f64, high: f64) -> Self {
        self.config.saturation_range = (low, high);
        self
    }

    pub fn contrast_range(mut self, low: f64, high: f64) -> Self {
        self.config.contrast_range = (low, high);
        self
    }

    /// Set the number of worker threads
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = Some(workers);
        self
    }

    /// Set the base seed for reproducible augmentation.
    ///
    /// Worker `i` seeds its generator with `seed + i`, so runs with the same seed
    /// and worker count draw identical parameters per worker.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the maximum wait for each sample in `get_batch`.
    ///
    /// - Too low: May fail batches during legitimate heavy decoding.
    /// - Unset: A starved pipeline blocks the caller until a worker delivers.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the worker polling interval
    ///
    /// - Too low: More responsive shutdown, higher CPU usage.
    /// - Too high: Less CPU overhead, slower shutdown response
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    pub fn max_consecutive_failures(mut self, failures: usize) -> Self {
        self.config.max_consecutive_failures = failures;
        self
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.config.extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
