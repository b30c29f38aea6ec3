//! Structured logging with batch and replay context.
//!
//! Provides logging macros and utilities that include batch_id and the
//! replay name in every log message for easy correlation.

pub mod structured;

pub use structured::*;
