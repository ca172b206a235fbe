//! src/pipeline/mod.rs
//!
//! This module implements `ImageVariations`, the multi-threaded producer side of
//! the augmentation pipeline.
//!
//! Worker threads keep a queue of freshly augmented `Sample`s filled while the
//! training loop pulls fixed-size batches from it. The queue is softly bounded:
//! workers pause once it holds `3 × batch_size` samples and resume when a batch
//! is requested.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────┐
//!                  │ Input folder │ (enumerated once, sorted)
//!                  └──────┬───────┘
//!                         │ round-robin shards
//!                         ↓
//!            ┌────────────┴────────────┐
//!            ↓                         ↓
//!     ┌─────────────┐           ┌─────────────┐
//!     │  Worker 0   │    ...    │  Worker N-1 │  ImageSource + StdRng(seed + id)
//!     └──────┬──────┘           └──────┬──────┘
//!            │ VariationGenerator      │
//!            └────────────┬────────────┘
//!                         ↓
//!                  ┌──────────────┐
//!                  │ Sample queue │ ←── high-water mark: 3 × batch_size
//!                  └──────┬───────┘
//!                         │ get_batch(n)  (raises ResumeSignal)
//!                         ↓
//!                  ┌──────────────┐
//!                  │ Training loop│
//!                  └──────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/pipeline/
//! ├── mod.rs           # Public API exports + module-level architecture docs
//! ├── config.rs        # PipelineConfig, builder, and validation
//! ├── coordinator.rs   # ImageVariations: construction, get_batch, close
//! ├── workers.rs       # WorkerPool and the worker loop
//! ├── source.rs        # ImageSource trait, in-memory and streaming sources, sharding
//! ├── signal.rs        # ResumeSignal (flag + condition variable)
//! └── common/
//!     ├── mod.rs
//!     └── thread.rs    # Worker RNG seeding, uniform draws
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .input_folder("data/faces")
//!     .image_size(64)
//!     .batch_size(16)
//!     .seed(42)
//!     .build();
//!
//! let mut variations = ImageVariations::new(config)?;
//! let batch: Vec<Sample> = variations.get_batch(16)?;
//! variations.close();
//! ```

pub mod common;
pub mod config;
pub mod coordinator;
pub mod signal;
pub mod source;
mod workers;

pub use common::thread::{init_worker_rng, uniform};
pub use config::{ColorMode, PipelineConfig, PipelineConfigBuilder, SourceMode};
pub use coordinator::ImageVariations;
pub use signal::ResumeSignal;
pub use source::{shard_round_robin, ImageSource, InMemorySource, Shard, StreamingSource};
