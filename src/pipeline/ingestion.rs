//! Main replay ingestion pipeline.
//!
//! Coordinates the analysis of a batch of uploaded replays:
//! 1. Container decoding
//! 2. Battle classification (optionally clan wars only)
//! 3. Performance extraction
//! 4. Aggregation over the accepted battles for the tracked roster

use std::collections::HashMap;

use serde::Serialize;

use crate::classification::battle::outcome;
use crate::extraction::performance::{extract_performance_with_context, PlayerPerformance};
use crate::logging::structured::LogContext;
use crate::rating::aggregate::{aggregate, AggregatePerformance, BattlePerformance, Player};
use crate::replay::container::{decode_with_context, DecodedReplay};
use crate::replay::model::AccountId;
use crate::{log_info, log_warn};

use super::context::BatchContext;
use super::summary::{summarize, BattleSummary};

/// Result of processing a single replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub name: String,
    pub accepted: bool,
    pub rejection_reason: Option<String>,
    pub battle: Option<BattleSummary>,
    pub performance: HashMap<AccountId, PlayerPerformance>,
}

impl ReplayResult {
    fn rejected(name: &str, reason: String, battle: Option<BattleSummary>) -> Self {
        Self {
            name: name.to_string(),
            accepted: false,
            rejection_reason: Some(reason),
            battle,
            performance: HashMap::new(),
        }
    }
}

/// Result of processing a batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub received_count: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub replays: Vec<ReplayResult>,
    /// One entry per tracked player, over the accepted replays.
    pub report: HashMap<Player, AggregatePerformance>,
}

/// Process a batch of named replay buffers.
///
/// Main entry point for replay analysis.
pub fn process_batch(ctx: &BatchContext, replays: Vec<(String, Vec<u8>)>) -> BatchResult {
    let mut results = Vec::with_capacity(replays.len());
    let mut battles = Vec::new();
    let mut accepted = 0;
    let mut rejected = 0;

    for (name, buffer) in &replays {
        let (result, battle) = process_single_replay(ctx, name, buffer);

        if result.accepted {
            accepted += 1;
        } else {
            rejected += 1;
        }
        battles.extend(battle);
        results.push(result);
    }

    let report = aggregate(&battles, &ctx.players);

    log_info!(
        ctx.log_context(),
        "BATCH_COMPLETE",
        received = replays.len(),
        accepted = accepted,
        rejected = rejected,
        players = report.len()
    );

    BatchResult {
        received_count: replays.len(),
        accepted_count: accepted,
        rejected_count: rejected,
        replays: results,
        report,
    }
}

/// Process a single replay.
fn process_single_replay(
    batch_ctx: &BatchContext,
    name: &str,
    buffer: &[u8],
) -> (ReplayResult, Option<BattlePerformance>) {
    let log_ctx = batch_ctx.replay_context(name);

    log::debug!("{} REPLAY_PROCESS_START size={}", log_ctx, buffer.len());

    // [1] DECODE
    let replay = match decode_with_context(buffer, &log_ctx) {
        Ok(replay) => replay,
        Err(e) => {
            log_warn!(log_ctx, "REPLAY_REJECTED", reason = "decode", error = e);
            return (ReplayResult::rejected(name, e.to_string(), None), None);
        }
    };

    // [2] CLASSIFY
    let battle = match summarize(&replay, &log_ctx) {
        Ok(battle) => battle,
        Err(e) => {
            log_warn!(log_ctx, "REPLAY_REJECTED", reason = "classification", error = e);
            return (ReplayResult::rejected(name, e.to_string(), None), None);
        }
    };

    if batch_ctx.require_clan_war && !battle.is_clan_war() {
        log_warn!(log_ctx, "REPLAY_REJECTED", reason = "not_clan_war", kind = battle.kind.as_str());
        return (
            ReplayResult::rejected(name, "replay is not from a clan war".to_string(), Some(battle)),
            None,
        );
    }

    // [3] EXTRACT
    let performance = match battle_performance(batch_ctx, &replay, &log_ctx) {
        Some(performance) => performance,
        None => {
            log_warn!(log_ctx, "REPLAY_REJECTED", reason = "incomplete");
            return (
                ReplayResult::rejected(
                    name,
                    "replay is incomplete (battle was left before it ended)".to_string(),
                    Some(battle),
                ),
                None,
            );
        }
    };

    log_info!(
        log_ctx,
        "REPLAY_COMPLETE",
        kind = battle.kind.as_str(),
        players = performance.players.len()
    );

    let result = ReplayResult {
        name: name.to_string(),
        accepted: true,
        rejection_reason: None,
        battle: Some(battle),
        performance: performance.players.clone(),
    };
    (result, Some(performance))
}

/// Performance of every revealed combatant, or `None` without a battle result.
fn battle_performance(
    ctx: &BatchContext,
    replay: &DecodedReplay,
    log_ctx: &LogContext,
) -> Option<BattlePerformance> {
    let result = replay.result_summary.as_ref()?;
    let victory = outcome(replay).ok()?;
    let players = extract_performance_with_context(result, ctx.tiers(), &result.account_names(), victory, log_ctx);

    Some(BattlePerformance { victory, players })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(sections: &[&str]) -> Vec<u8> {
        let mut out = vec![0x12, 0x32, 0x34, 0x11];
        out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
        for section in sections {
            out.extend_from_slice(&(section.len() as u32).to_le_bytes());
            out.extend_from_slice(section.as_bytes());
        }
        out
    }

    const SECTION_A: &str = r#"{
        "playerName": "Alice", "mapName": "19_monastery", "dateTime": "24.12.2013 20:15:00",
        "vehicles": {"10": {"name": "Alice", "team": 1}, "20": {"name": "Bob", "team": 2}}
    }"#;

    fn section_b(enemy_clan: &str) -> String {
        format!(
            r#"[{{
                "common": {{"winnerTeam": 1, "duration": 300}},
                "vehicles": {{
                    "10": {{"accountDBID": 1, "team": 1, "damageDealt": 1200, "kills": 1}},
                    "20": {{"accountDBID": 2, "team": 2, "damageDealt": 300, "deathReason": 0}}
                }},
                "players": {{
                    "1": {{"name": "Alice", "clanAbbrev": "AAA", "team": 1}},
                    "2": {{"name": "Bob", "clanAbbrev": "{0}", "team": 2}}
                }}
            }}, {{
                "10": {{"name": "Alice", "team": 1, "clanAbbrev": "AAA", "vehicleType": "ussr:T-34"}},
                "20": {{"name": "Bob", "team": 2, "clanAbbrev": "{0}", "vehicleType": "germany:Maus"}}
            }}]"#,
            enemy_clan
        )
    }

    fn roster() -> Vec<Player> {
        vec![
            Player {
                player_id: 7,
                display_name: "Alice".to_string(),
                account_id: 1,
            },
            Player {
                player_id: 8,
                display_name: "Carol".to_string(),
                account_id: 3,
            },
        ]
    }

    #[test]
    fn test_process_batch() {
        let ctx = BatchContext::new(roster());
        let replays = vec![
            ("cw.wotreplay".to_string(), buffer(&[SECTION_A, section_b("BBB").as_str()])),
            ("junk.wotreplay".to_string(), b"not a replay at all".to_vec()),
            ("left.wotreplay".to_string(), buffer(&[SECTION_A])),
        ];

        let result = process_batch(&ctx, replays);
        assert_eq!(result.received_count, 3);
        assert_eq!(result.accepted_count, 1);
        assert_eq!(result.rejected_count, 2);

        let cw = &result.replays[0];
        assert!(cw.accepted);
        assert_eq!(cw.performance[&1].tier, 5);
        assert_eq!(cw.performance[&2].tier, 10);
        assert!(cw.battle.as_ref().unwrap().is_clan_war());

        assert!(result.replays[1].rejection_reason.is_some());
        assert!(result.replays[1].battle.is_none());

        let left = &result.replays[2];
        assert!(!left.accepted);
        assert!(left.rejection_reason.as_deref().unwrap().contains("incomplete"));
        assert!(left.battle.is_some());

        let alice = &result.report[&roster()[0]];
        assert_eq!(alice.battle_count, 1);
        assert_eq!(alice.avg_dmg, 1200.0);
        assert_eq!(alice.win_rate, 1.0);
        assert_eq!(result.report[&roster()[1]].battle_count, 0);
    }

    #[test]
    fn test_require_clan_war() {
        let replays = vec![("pub.wotreplay".to_string(), buffer(&[SECTION_A, section_b("AAA").as_str()]))];

        let lenient = process_batch(&BatchContext::new(roster()), replays.clone());
        assert_eq!(lenient.accepted_count, 1);

        let strict = process_batch(&BatchContext::new(roster()).with_require_clan_war(true), replays);
        assert_eq!(strict.accepted_count, 0);
        assert_eq!(
            strict.replays[0].rejection_reason.as_deref(),
            Some("replay is not from a clan war")
        );
        assert_eq!(strict.report[&roster()[0]].battle_count, 0);
    }
}
