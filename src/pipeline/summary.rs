//! Battle record derived from one decoded replay.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::classification::battle::{battle_outcome, classify, score, BattleKind, BattleOutcome, ClassificationError};
use crate::classification::identity::{battle_checksum, player_team};
use crate::logging::structured::LogContext;
use crate::replay::container::DecodedReplay;
use crate::tiers::maps::{map_display_name, UNKNOWN_MAP};

/// Format of the recorder's `dateTime`.
pub const REPLAY_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// What a battle record needs from a replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
    pub map_id: String,
    pub map_name: String,
    pub played_at: Option<NaiveDateTime>,
    pub recorded_by: String,
    pub kind: BattleKind,
    pub outcome: Option<BattleOutcome>,
    pub duration_secs: Option<u64>,
    /// `(enemy_deaths, own_deaths)`.
    pub score: Option<(u32, u32)>,
    pub player_team: Vec<String>,
    /// Only for clan wars.
    pub checksum: Option<String>,
}

impl BattleSummary {
    pub fn is_clan_war(&self) -> bool {
        matches!(self.kind, BattleKind::ClanWar { .. })
    }
}

/// Summarize a replay. Fails only when the recording player cannot be found.
///
/// Incomplete replays still summarize; outcome, duration and score are then
/// absent.
pub fn summarize(replay: &DecodedReplay, ctx: &LogContext) -> Result<BattleSummary, ClassificationError> {
    let recorder = &replay.recorder_summary;
    let team = player_team(replay)?;
    let kind = classify(replay, ctx)?;

    let (outcome, duration_secs, score) = match &replay.result_summary {
        Some(result) => (
            Some(battle_outcome(replay)?),
            result.common.duration_secs(),
            Some(score(replay)?),
        ),
        None => (None, None, None),
    };

    let checksum = match kind {
        BattleKind::ClanWar { .. } => Some(battle_checksum(replay)?),
        _ => None,
    };

    Ok(BattleSummary {
        map_id: recorder.map_name.clone(),
        map_name: resolve_map_name(replay),
        played_at: parse_played_at(recorder.date_time.as_deref()),
        recorded_by: recorder.player_name.clone(),
        kind,
        outcome,
        duration_secs,
        score,
        player_team: team,
        checksum,
    })
}

/// Builtin English name, else the name stored in the replay, else `Unknown`.
fn resolve_map_name(replay: &DecodedReplay) -> String {
    let recorder = &replay.recorder_summary;
    map_display_name(&recorder.map_name)
        .map(str::to_string)
        .or_else(|| recorder.map_display_name.clone().filter(|n| !n.is_empty()))
        .unwrap_or_else(|| UNKNOWN_MAP.to_string())
}

fn parse_played_at(date_time: Option<&str>) -> Option<NaiveDateTime> {
    date_time.and_then(|s| NaiveDateTime::parse_from_str(s, REPLAY_DATE_FORMAT).ok())
}
