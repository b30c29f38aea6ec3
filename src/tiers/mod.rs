//! Static game data.
//!
//! Vehicle tiers and map display names, shared read-only across threads.

pub mod maps;
pub mod table;

pub use maps::*;
pub use table::*;
