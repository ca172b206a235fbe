//! src/pipeline/coordinator.rs
//!
//! `ImageVariations`: the consumer-facing side of the pipeline.
//!
//! # Constructor Overview
//!
//! - `new()` - Enumerates `config.input_folder` once, shards the sorted file
//!   list round-robin across the workers and starts them. Depending on
//!   `config.source_mode`, each worker preloads its shard or decodes per draw.
//! - `from_images()` - Same, from images that are already decoded. Always
//!   served from memory.
//!
//! # Seed Coordination
//!
//! Worker `i` seeds its RNG with `seed + i`. With `config.seed` set and a fixed
//! worker count, each worker draws the same sequence of sources and parameters
//! on every run. Batches are assembled in arrival order, so only a
//! single-worker pipeline yields identical batches across runs.

use anyhow::{anyhow, bail, ensure, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use image::DynamicImage;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use super::config::PipelineConfig;
use super::source::{shard_round_robin, Shard};
use super::workers::WorkerPool;
use crate::readers::ImageDirSource;
use crate::sample::Sample;
use crate::transforms::VariationGenerator;

/// Runs a pool of augmentation workers and serves their output in batches.
///
/// # Thread safety:
/// - `get_batch` takes `&mut self`: there is exactly one consumer.
/// - `close` only flips an atomic flag and may be called at any time.
/// - Dropping the coordinator closes the pipeline and joins every worker.
///
/// # Example
/// ```ignore
/// let config = PipelineConfig::builder()
///     .input_folder("data/faces")
///     .batch_size(32)
///     .build();
/// let mut variations = ImageVariations::new(config)?;
/// for _ in 0..steps {
///     let batch = variations.get_batch(32)?;
///     train_step(&batch);
/// }
/// variations.join();
/// ```
pub struct ImageVariations {
    config: PipelineConfig,
    receiver: Receiver<Sample>,
    pool: WorkerPool,
}

impl ImageVariations {
    /// Starts a pipeline over the images in `config.input_folder`.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Missing or unreadable input folder
    /// - Input folder without files matching `config.extensions`
    /// - Worker thread creation failure
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let files = ImageDirSource::new(
            &config.input_folder,
            config.extensions.as_slice(),
            config.recursive,
        )
        .list()
        .with_context(|| {
            format!(
                "Failed to enumerate input folder {}",
                config.input_folder.display()
            )
        })?;
        ensure!(
            !files.is_empty(),
            "No images ({}) found in {}",
            config.extensions.join(", "),
            config.input_folder.display()
        );

        let num_workers = config.resolved_num_workers().min(files.len());
        info!(
            files = files.len(),
            workers = num_workers,
            source_mode = ?config.source_mode,
            "starting image variation pipeline"
        );

        let shards = shard_round_robin(files, num_workers)
            .into_iter()
            .map(Shard::Paths)
            .collect();
        Self::start(config, shards)
    }

    /// Starts a pipeline over already decoded images.
    ///
    /// Images are converted to `config.color_mode`; `config.source_mode` and the
    /// folder settings are ignored.
    pub fn from_images(images: Vec<DynamicImage>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        ensure!(!images.is_empty(), "Cannot start a pipeline without source images");

        let num_workers = config.resolved_num_workers().min(images.len());
        debug!(
            images = images.len(),
            workers = num_workers,
            "starting pipeline from decoded images"
        );

        let shards = shard_round_robin(images, num_workers)
            .into_iter()
            .map(Shard::Images)
            .collect();
        Self::start(config, shards)
    }

    fn start(config: PipelineConfig, shards: Vec<Shard>) -> Result<Self> {
        let generator = Arc::new(VariationGenerator::new(&config)?);
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let (sender, receiver) = unbounded();

        let pool = WorkerPool::spawn(shards, generator, sender, &config, base_seed)?;

        Ok(Self {
            config,
            receiver,
            pool,
        })
    }

    /// Returns exactly `n` freshly augmented samples.
    ///
    /// Paused workers are released for as long as the call is collecting. The
    /// call blocks until `n` samples have arrived, unless `config.timeout` is
    /// set, in which case waiting longer than that for any single sample is an
    /// error.
    ///
    /// # Errors
    /// - Timeout while waiting for a sample (only with `config.timeout`)
    /// - Every worker has exited and the queue is drained
    pub fn get_batch(&mut self, n: usize) -> Result<Vec<Sample>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let _raised = self.pool.resume().raise();
        let mut batch = Vec::with_capacity(n);
        while batch.len() < n {
            batch.push(self.next_sample(batch.len(), n)?);
        }
        Ok(batch)
    }

    fn next_sample(&self, received: usize, requested: usize) -> Result<Sample> {
        match self.config.timeout {
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(sample) => Ok(sample),
                Err(RecvTimeoutError::Timeout) => bail!(
                    "Timed out after {:?} waiting for sample {} of {}",
                    timeout,
                    received + 1,
                    requested
                ),
                Err(RecvTimeoutError::Disconnected) => Err(workers_gone(received, requested)),
            },
            None => self
                .receiver
                .recv()
                .map_err(|_| workers_gone(received, requested)),
        }
    }

    /// Asks every worker to stop after its current iteration. Does not wait.
    pub fn close(&self) {
        if !self.pool.is_closed() {
            debug!("closing image variation pipeline");
        }
        self.pool.close();
    }

    /// Closes the pipeline and waits for every worker thread to exit.
    pub fn join(mut self) {
        self.pool.join();
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Number of samples currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    /// Number of worker threads that were started.
    pub fn num_workers(&self) -> usize {
        self.pool.len()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

fn workers_gone(received: usize, requested: usize) -> anyhow::Error {
    anyhow!(
        "All workers have exited; received {} of {} samples",
        received,
        requested
    )
}

impl std::fmt::Debug for ImageVariations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageVariations")
            .field("num_workers", &self.num_workers())
            .field("queued", &self.queued())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
