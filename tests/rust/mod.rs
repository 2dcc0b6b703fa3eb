//! seqlsh Integration Tests
//!
//! End-to-end scenarios over the ingestion pipeline, the inverse index,
//! persistence and density clustering.

pub mod common;
pub mod test_backpressure;
pub mod test_bucket_overflow;
pub mod test_end_to_end_clustering;
pub mod test_persistence;
pub mod test_pipeline_failures;

// Re-export common utilities
pub use common::*;
