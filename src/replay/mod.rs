//! Replay container decoding.
//!
//! Turns a raw replay buffer into a `DecodedReplay`:
//! - `container` - section framing and the fatal/degraded failure policy
//! - `model` - typed recorder and battle-result sections
//! - `legacy` - the trailing serialized block of older files

pub mod container;
pub mod legacy;
pub mod model;

pub use container::*;
pub use legacy::{unpickle, LegacyPayloadError, MAX_LEGACY_DEPTH, MAX_LEGACY_NODES};
pub use model::*;
