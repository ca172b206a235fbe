//! src/pipeline/workers.rs
//!
//! Worker threads that keep the sample queue topped up.
//!
//! # Worker loop
//!
//! ```text
//!   ┌──────────────► draw source image (worker-local RNG)
//!   │                      │
//!   │                      ↓
//!   │               VariationGenerator ──(error)──► warn!, count failure
//!   │                      │                              │
//!   │                      ↓                       too many in a row? ──► exit
//!   │                push Sample
//!   │                      │
//!   │                      ↓
//!   │              shutdown flag set? ──yes──► exit
//!   │                      │ no
//!   │                      ↓
//!   │        queue >= high-water mark? ──yes──► wait on ResumeSignal
//!   │                      │ no                  (close() wakes it; shutdown
//!   └──────────────────────┘                      also re-checked every
//!                                                 worker_timeout)
//! ```
//!
//! Workers only share the queue sender, the shutdown flag and the resume
//! signal. Sources, RNG state and failure counters are private to each thread.

use anyhow::{ensure, Context, Result};
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::common::thread::init_worker_rng;
use super::config::{ColorMode, PipelineConfig, SourceMode};
use super::signal::ResumeSignal;
use super::source::{ImageSource, Shard};
use crate::sample::Sample;
use crate::transforms::VariationGenerator;

/// Everything a worker thread needs besides its shard and RNG.
#[derive(Clone)]
struct WorkerContext {
    generator: Arc<VariationGenerator>,
    sender: Sender<Sample>,
    shutdown: Arc<AtomicBool>,
    resume: Arc<ResumeSignal>,
    high_water: usize,
    worker_timeout: Duration,
    max_consecutive_failures: usize,
    source_mode: SourceMode,
    color_mode: ColorMode,
}

impl WorkerContext {
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Parks the worker while the queue is at or above the high-water mark.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    fn wait_for_room(&self) -> bool {
        while self.sender.len() >= self.high_water {
            if self.is_shutdown() {
                return false;
            }
            if self
                .resume
                .wait_timeout_or(self.worker_timeout, || self.is_shutdown())
            {
                break;
            }
        }
        !self.is_shutdown()
    }
}

/// Handle to the running worker threads.
///
/// Dropping the pool sets the shutdown flag and joins every worker.
pub(crate) struct WorkerPool {
    workers: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    resume: Arc<ResumeSignal>,
}

impl WorkerPool {
    /// Spawns one worker per shard.
    ///
    /// `sender` is consumed: once every worker has exited the channel
    /// disconnects, which is how the consumer learns that production stopped.
    pub(crate) fn spawn(
        shards: Vec<Shard>,
        generator: Arc<VariationGenerator>,
        sender: Sender<Sample>,
        config: &PipelineConfig,
        base_seed: u64,
    ) -> Result<Self> {
        ensure!(!shards.is_empty(), "Cannot create WorkerPool with 0 workers");

        let context = WorkerContext {
            generator,
            sender,
            shutdown: Arc::new(AtomicBool::new(false)),
            resume: Arc::new(ResumeSignal::new()),
            high_water: config.high_water_mark(),
            worker_timeout: config.worker_timeout,
            max_consecutive_failures: config.max_consecutive_failures,
            source_mode: config.source_mode,
            color_mode: config.color_mode,
        };

        // Built up front so a failed spawn still shuts down the workers already running.
        let mut pool = Self {
            workers: Vec::with_capacity(shards.len()),
            shutdown: context.shutdown.clone(),
            resume: context.resume.clone(),
        };

        for (worker_id, shard) in shards.into_iter().enumerate() {
            let context = context.clone();
            let rng = init_worker_rng(base_seed, worker_id);

            let handle = thread::Builder::new()
                .name(format!("image-variations-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, shard, context, rng))
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            pool.workers.push(handle);
        }

        debug!(workers = pool.workers.len(), base_seed, "worker pool started");
        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn resume(&self) -> &ResumeSignal {
        &self.resume
    }

    /// Requests shutdown and wakes paused workers. Workers exit after their
    /// current iteration.
    pub(crate) fn close(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.resume.wake();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Requests shutdown and waits for every worker thread to finish.
    pub(crate) fn join(&mut self) {
        self.close();
        for (worker_id, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() {
                error!(worker_id, "worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_worker(worker_id: usize, shard: Shard, context: WorkerContext, mut rng: StdRng) {
    let source = shard.open(context.source_mode, context.color_mode);
    if source.is_empty() {
        error!(worker_id, "no usable source images in shard; worker exiting");
        return;
    }
    debug!(worker_id, images = source.len(), "worker started");

    let mut failures = 0usize;
    loop {
        match produce(source.as_ref(), &context.generator, &mut rng) {
            Ok(sample) => {
                failures = 0;
                // The receiver only goes away when the coordinator is dropped.
                if context.sender.send(sample).is_err() {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    worker_id,
                    failures,
                    error = %format!("{:#}", e),
                    "skipping failed draw"
                );
                if failures >= context.max_consecutive_failures {
                    error!(worker_id, failures, "too many consecutive failures; worker exiting");
                    break;
                }
            }
        }

        if context.is_shutdown() || !context.wait_for_room() {
            break;
        }
    }

    debug!(worker_id, "worker stopped");
}

fn produce(
    source: &dyn ImageSource,
    generator: &VariationGenerator,
    rng: &mut StdRng,
) -> Result<Sample> {
    let image = source.draw(rng).context("Failed to draw source image")?;
    generator.generate(&image, rng)
}
