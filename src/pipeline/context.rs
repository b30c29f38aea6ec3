//! Pipeline context management.
//!
//! Per-batch options and the logging context handed down to each replay.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;
use crate::rating::aggregate::Player;
use crate::tiers::table::TierTable;

/// Prefix of generated batch ids.
pub const BATCH_ID_PREFIX: &str = "batch-";

/// Context for a batch of replays.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch_id: String,
    pub received_at: DateTime<Utc>,
    /// Roster the aggregate report is computed for.
    pub players: Vec<Player>,
    /// Reject replays that are not clan wars.
    pub require_clan_war: bool,
    tier_table: Option<TierTable>,
}

impl BatchContext {
    pub fn new(players: Vec<Player>) -> Self {
        let batch_id = format!("{}{}", BATCH_ID_PREFIX, &Uuid::new_v4().to_string()[..8]);

        Self {
            batch_id,
            received_at: Utc::now(),
            players,
            require_clan_war: false,
            tier_table: None,
        }
    }

    pub fn with_require_clan_war(mut self, require: bool) -> Self {
        self.require_clan_war = require;
        self
    }

    /// Use this table instead of the builtin one.
    pub fn with_tier_table(mut self, table: TierTable) -> Self {
        self.tier_table = Some(table);
        self
    }

    pub fn tiers(&self) -> &TierTable {
        self.tier_table.as_ref().unwrap_or(TierTable::builtin())
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.batch_id)
    }

    /// Logging context for one replay of this batch.
    pub fn replay_context(&self, replay_name: &str) -> LogContext {
        self.log_context().with_replay(replay_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_format() {
        let ctx = BatchContext::new(Vec::new());
        assert!(ctx.batch_id.starts_with(BATCH_ID_PREFIX));
        assert_eq!(ctx.batch_id.len(), BATCH_ID_PREFIX.len() + 8);
        assert_ne!(ctx.batch_id, BatchContext::new(Vec::new()).batch_id);
    }

    #[test]
    fn test_tier_table_override() {
        let ctx = BatchContext::new(Vec::new());
        assert_eq!(ctx.tiers().tier_of("T-34"), 5);

        let ctx = ctx.with_tier_table(TierTable::from_entries([("T-34", 6)]));
        assert_eq!(ctx.tiers().tier_of("T-34"), 6);
    }

    #[test]
    fn test_replay_context() {
        let ctx = BatchContext::new(Vec::new()).with_require_clan_war(true);
        assert!(ctx.require_clan_war);

        let log_ctx = ctx.replay_context("a.wotreplay");
        assert_eq!(
            format!("{}", log_ctx),
            format!("[batch={}] [replay=a.wotreplay]", ctx.batch_id)
        );
    }
}
