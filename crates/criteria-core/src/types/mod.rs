//! Value types shared across the engine

pub mod marker;
pub mod threshold;
pub mod verdict;

pub use marker::MarkerValue;
pub use threshold::ThresholdValue;
pub use verdict::Verdict;
