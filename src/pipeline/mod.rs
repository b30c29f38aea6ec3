//! Pipeline orchestration module.
//!
//! Batch analysis of uploaded replays that coordinates:
//! - Container decoding
//! - Battle classification and summaries
//! - Performance extraction
//! - Aggregation for the tracked roster

pub mod context;
pub mod ingestion;
pub mod summary;

pub use context::*;
pub use ingestion::*;
pub use summary::*;
