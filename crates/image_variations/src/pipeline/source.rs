//! src/pipeline/source.rs
//!
//! Per-worker image sources.
//!
//! Each worker owns one `ImageSource` built from its shard of the input:
//!
//! - `InMemorySource`: every file of the shard is decoded once, up front.
//!   Draws borrow from memory.
//! - `StreamingSource`: only paths are kept; a draw picks a path and decodes
//!   it on the spot.
//!
//! Draws are uniform over the shard and use the worker's own RNG.

use anyhow::{ensure, Result};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::Rng;
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::pipeline::config::{ColorMode, SourceMode};
use crate::transforms::vision::LoadImage;

/// Something a worker can draw source images from.
pub trait ImageSource: Send {
    /// Number of images (or paths) the source can draw from.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns one source image chosen uniformly at random.
    fn draw(&self, rng: &mut StdRng) -> Result<Cow<'_, DynamicImage>>;
}

// ============================================================================
// InMemorySource
// ============================================================================

/// Source holding decoded images.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    images: Vec<DynamicImage>,
}

impl InMemorySource {
    /// Wraps images that are already decoded, converting them to `color_mode`.
    pub fn new(images: Vec<DynamicImage>, color_mode: ColorMode) -> Self {
        Self {
            images: images.into_iter().map(|img| color_mode.convert(img)).collect(),
        }
    }

    /// Decodes every path with `loader`. Files that fail to decode are logged and left out.
    pub fn preload(paths: &[PathBuf], loader: &LoadImage) -> Self {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            match loader.load(path) {
                Ok(img) => images.push(img),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %format!("{:#}", e),
                    "skipping unreadable image"
                ),
            }
        }
        debug!(loaded = images.len(), requested = paths.len(), "preloaded shard");
        Self { images }
    }
}

impl ImageSource for InMemorySource {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn draw(&self, rng: &mut StdRng) -> Result<Cow<'_, DynamicImage>> {
        ensure!(!self.images.is_empty(), "Cannot draw from an empty image source");
        let index = rng.random_range(0..self.images.len());
        Ok(Cow::Borrowed(&self.images[index]))
    }
}

// ============================================================================
// StreamingSource
// ============================================================================

/// Source holding only file paths; each draw decodes a file.
#[derive(Debug, Clone)]
pub struct StreamingSource {
    paths: Vec<PathBuf>,
    loader: LoadImage,
}

impl StreamingSource {
    pub fn new(paths: Vec<PathBuf>, loader: LoadImage) -> Self {
        Self { paths, loader }
    }
}

impl ImageSource for StreamingSource {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn draw(&self, rng: &mut StdRng) -> Result<Cow<'_, DynamicImage>> {
        ensure!(!self.paths.is_empty(), "Cannot draw from an empty image source");
        let index = rng.random_range(0..self.paths.len());
        self.loader.load(&self.paths[index]).map(Cow::Owned)
    }
}

// ============================================================================
// Sharding
// ============================================================================

/// What a worker is handed at spawn time, before its source is opened.
#[derive(Debug)]
pub enum Shard {
    Paths(Vec<PathBuf>),
    Images(Vec<DynamicImage>),
}

impl Shard {
    /// Opens the shard as an image source.
    ///
    /// Decoded images are always served from memory; paths follow `mode`.
    /// Runs on the worker thread so preloading is spread across workers.
    pub fn open(self, mode: SourceMode, color_mode: ColorMode) -> Box<dyn ImageSource> {
        match (self, mode) {
            (Shard::Images(images), _) => Box::new(InMemorySource::new(images, color_mode)),
            (Shard::Paths(paths), SourceMode::InMemory) => {
                Box::new(InMemorySource::preload(&paths, &LoadImage::new(color_mode)))
            }
            (Shard::Paths(paths), SourceMode::Streaming) => {
                Box::new(StreamingSource::new(paths, LoadImage::new(color_mode)))
            }
        }
    }
}

/// Deals `items` round-robin into `num_shards` shards.
///
/// Shard `i` receives items `i, i + n, i + 2n, ...` in their original order, so
/// a sorted input gives the same shards on every run.
pub fn shard_round_robin<T>(items: Vec<T>, num_shards: usize) -> Vec<Vec<T>> {
    let mut shards: Vec<Vec<T>> = (0..num_shards).map(|_| Vec::new()).collect();
    if num_shards == 0 {
        return shards;
    }
    for (i, item) in items.into_iter().enumerate() {
        shards[i % num_shards].push(item);
    }
    shards
}
