//! src/transforms/vision/mod.rs
//!
//! Vision transforms used to build one image variation.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Random-scale crop, rotation with crop-back, resize
//! ├── photometric.rs   → Brightness, saturation and contrast jitter
//! ├── augmentation.rs  → Random horizontal flip
//! ├── conversion.rs    → Image → Sample
//! └── io.rs            → Image loading in the configured color mode
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::transforms::Transform;
//! use crate::transforms::vision::{RandomRotation, RandomHorizontalFlip, Resize, ToSample};
//! use image::imageops::FilterType;
//!
//! let pipeline = RandomRotation::new(30)?
//!     .then(RandomHorizontalFlip::new(0.5)?)
//!     .then(Resize::square(64, FilterType::Lanczos3)?)
//!     .then(ToSample::new(ColorMode::Color));
//! ```

pub mod augmentation;
pub mod conversion;
pub mod geometric;
pub mod io;
pub mod photometric;

pub use augmentation::RandomHorizontalFlip;
pub use conversion::ToSample;
pub use geometric::{
    rotate_about_center, rotation_margin, CropBox, CropScalePolicy, RandomRotation,
    RandomScaleCrop, Resize,
};
pub use io::LoadImage;
pub use photometric::{Enhancement, RandomEnhance};
