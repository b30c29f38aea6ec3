//! Rating and aggregation module.
//!
//! Folds per-battle performance into per-player means and computes the WN7
//! composite rating from them.

pub mod aggregate;
pub mod wn7;

pub use aggregate::*;
pub use wn7::*;
