//! Per-worker RNG helpers.
//!
//! Every worker owns its own `StdRng`; nothing random is shared between threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed formula: base_seed + worker_id
/// This gives each worker unique but deterministic randomness.
pub fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    base_seed.wrapping_add(worker_id as u64)
}

/// Creates the private RNG for one worker.
pub fn init_worker_rng(base_seed: u64, worker_id: usize) -> StdRng {
    StdRng::seed_from_u64(worker_seed(base_seed, worker_id))
}

/// Draws from `[low, high)` as `low + (high - low) * U[0, 1)`.
///
/// Unlike `Rng::random_range` the bounds may be given in either order; an
/// inverted pair yields a value in `(high, low]`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.random::<f64>()
}
