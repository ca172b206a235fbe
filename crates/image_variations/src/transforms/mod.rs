pub mod core;
pub mod variation;
pub mod vision;

pub use self::core::{Chain, Transform};
pub use variation::VariationGenerator;
