//! Battle classification module.
//!
//! Derives team membership, clan identity, outcome and score from a
//! decoded replay:
//! - `battle` - teams, clan-war heuristic, outcome and kill score
//! - `identity` - own-team lineup, battle checksums, same-battle checks

pub mod battle;
pub mod identity;

pub use battle::*;
pub use identity::*;
