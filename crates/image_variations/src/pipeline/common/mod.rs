//! src/pipeline/common/mod.rs
//!
//! Utilities shared by the coordinator, the workers and the transforms.

pub mod thread;
