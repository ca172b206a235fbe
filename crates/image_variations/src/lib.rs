//! Image variations: a multi-threaded augmentation pipeline that keeps a queue
//! of randomly cropped, rotated, flipped and color-jittered square samples
//! ready for a training loop.
//!
//! ```ignore
//! use image_variations::{ImageVariations, PipelineConfig};
//!
//! let config = PipelineConfig::builder().input_folder("data/input").build();
//! let mut variations = ImageVariations::new(config)?;
//! let batch = variations.get_batch(16)?;
//! variations.close();
//! ```

pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod readers;
pub mod sample;
pub mod transforms;

pub use persist::save_sample;
pub use pipeline::{ColorMode, ImageVariations, PipelineConfig, SourceMode};
pub use sample::Sample;
pub use transforms::VariationGenerator;
