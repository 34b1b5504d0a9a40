pub mod catalog;
pub mod engine;
pub mod result_aggregator;
pub mod safe_mode;
