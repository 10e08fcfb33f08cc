pub mod aggregator;
pub mod analyzer;
pub mod range;
