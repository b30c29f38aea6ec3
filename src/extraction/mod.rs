//! Performance extraction module.
//!
//! Maps a battle result's combatant entries to per-player performance.

pub mod lenient;
pub mod performance;

pub use lenient::*;
pub use performance::*;
