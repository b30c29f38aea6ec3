//! Battle classification.
//!
//! Team membership, clan identity, outcome and kill score of a decoded
//! replay. Clan-war detection is a heuristic: a battle counts as a clan war
//! when each team carries exactly one clan tag and the two tags differ.
//! Pickup groups and same-clan scrimmages fail the test, as they should; a
//! clan war fought with a mercenary in the lineup fails it too.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::structured::LogContext;
use crate::replay::container::DecodedReplay;
use crate::replay::model::{ResultSummary, TeamId};
use crate::tiers::table::strip_namespace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The replay has no battle result (recorder left before the end).
    #[error("battle result unavailable")]
    ResultUnavailable,

    #[error("recording player {0:?} not found among the recorded vehicles")]
    OwnTeamNotFound(String),

    /// Clan guesses are only made for clan wars.
    #[error("battle is not a clan war")]
    NotClanWar,
}

/// One combatant as listed in the vehicle detail block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub team: TeamId,
    /// Empty for players without a clan.
    pub clan_abbrev: String,
    /// Vehicle text id without its nation prefix; `None` if never spotted.
    pub vehicle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleOutcome {
    Victory,
    Defeat,
    Draw,
}

impl BattleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleOutcome::Victory => "victory",
            BattleOutcome::Defeat => "defeat",
            BattleOutcome::Draw => "draw",
        }
    }
}

/// What kind of battle a replay records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleKind {
    ClanWar { clan: String, enemy_clan: String },
    /// Complete, but the teams are not two distinct single-clan lineups.
    Other,
    /// No battle result to classify.
    Incomplete,
}

impl BattleKind {
    pub fn as_str(&self) -> &str {
        match self {
            BattleKind::ClanWar { .. } => "clan_war",
            BattleKind::Other => "other",
            BattleKind::Incomplete => "incomplete",
        }
    }
}

pub(crate) fn require_result(replay: &DecodedReplay) -> Result<&ResultSummary, ClassificationError> {
    replay
        .result_summary
        .as_ref()
        .ok_or(ClassificationError::ResultUnavailable)
}

/// Team number of the recording player, found by name among the recorder's
/// own vehicles.
pub fn own_team(replay: &DecodedReplay) -> Result<TeamId, ClassificationError> {
    let recorder = &replay.recorder_summary;
    if recorder.player_name.is_empty() {
        return Err(ClassificationError::OwnTeamNotFound(String::new()));
    }
    recorder
        .vehicles
        .values()
        .find(|v| v.name == recorder.player_name)
        .map(|v| v.team)
        .ok_or_else(|| ClassificationError::OwnTeamNotFound(recorder.player_name.clone()))
}

/// The other team number.
pub fn opposing_team(team: TeamId) -> TeamId {
    if team == 2 {
        1
    } else {
        2
    }
}

/// All combatants of one team, in vehicle id order.
///
/// Read from the vehicle detail block; results without one fall back to the
/// combatant stats, named through the player block.
pub fn team_roster(replay: &DecodedReplay, team: TeamId) -> Result<Vec<RosterEntry>, ClassificationError> {
    let result = require_result(replay)?;
    if result.details.is_empty() {
        return Ok(result
            .vehicles
            .iter()
            .filter(|v| v.team == team)
            .map(|v| RosterEntry {
                name: result
                    .players
                    .get(&v.account_dbid)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                team: v.team,
                clan_abbrev: v.clan_abbrev.clone().unwrap_or_default(),
                vehicle: revealed_vehicle(v.vehicle_type.as_deref()),
            })
            .collect());
    }

    Ok(result
        .details
        .values()
        .filter(|d| d.team == team)
        .map(|d| RosterEntry {
            name: d.name.clone(),
            team: d.team,
            clan_abbrev: d.clan_abbrev.clone().unwrap_or_default(),
            vehicle: revealed_vehicle(d.vehicle_type.as_deref()),
        })
        .collect())
}

fn revealed_vehicle(vehicle_type: Option<&str>) -> Option<String> {
    vehicle_type.and_then(strip_namespace).map(str::to_string)
}

/// The single clan tag of a roster, if it has exactly one.
fn unique_clan(roster: &[RosterEntry]) -> Option<&str> {
    let tags: BTreeSet<&str> = roster.iter().map(|p| p.clan_abbrev.as_str()).collect();
    if tags.len() == 1 {
        tags.into_iter().next()
    } else {
        None
    }
}

/// Whether both teams are single-clan lineups of different clans.
pub fn is_clan_war(replay: &DecodedReplay) -> Result<bool, ClassificationError> {
    let team_one = team_roster(replay, 1)?;
    let team_two = team_roster(replay, 2)?;

    Ok(match (unique_clan(&team_one), unique_clan(&team_two)) {
        (Some(one), Some(two)) => one != two,
        _ => false,
    })
}

/// Clan of the recording player's team. Fails unless the battle is a clan war.
pub fn guess_own_clan(replay: &DecodedReplay) -> Result<String, ClassificationError> {
    if !is_clan_war(replay)? {
        return Err(ClassificationError::NotClanWar);
    }
    let team = own_team(replay)?;
    let roster = team_roster(replay, team)?;
    let player_name = &replay.recorder_summary.player_name;

    roster
        .iter()
        .find(|p| &p.name == player_name)
        .or_else(|| roster.first())
        .map(|p| p.clan_abbrev.clone())
        .ok_or(ClassificationError::NotClanWar)
}

/// Clan of the opposing team. Fails unless the battle is a clan war.
pub fn guess_enemy_clan(replay: &DecodedReplay) -> Result<String, ClassificationError> {
    if !is_clan_war(replay)? {
        return Err(ClassificationError::NotClanWar);
    }
    let enemy = opposing_team(own_team(replay)?);

    team_roster(replay, enemy)?
        .into_iter()
        .next()
        .map(|p| p.clan_abbrev)
        .ok_or(ClassificationError::NotClanWar)
}

pub fn battle_outcome(replay: &DecodedReplay) -> Result<BattleOutcome, ClassificationError> {
    let result = require_result(replay)?;
    let team = own_team(replay)?;

    Ok(match result.common.winner_team {
        0 => BattleOutcome::Draw,
        winner if winner == team => BattleOutcome::Victory,
        _ => BattleOutcome::Defeat,
    })
}

/// True iff the recording player's team won.
pub fn outcome(replay: &DecodedReplay) -> Result<bool, ClassificationError> {
    Ok(battle_outcome(replay)? == BattleOutcome::Victory)
}

/// Destroyed vehicles per side as `(enemy_deaths, own_deaths)`.
///
/// A raw kill tally, not the in-game score.
pub fn score(replay: &DecodedReplay) -> Result<(u32, u32), ClassificationError> {
    let result = require_result(replay)?;
    let team = own_team(replay)?;

    let mut enemy_deaths = 0;
    let mut own_deaths = 0;
    for vehicle in result.vehicles.iter().filter(|v| !v.survived()) {
        if vehicle.team == team {
            own_deaths += 1;
        } else {
            enemy_deaths += 1;
        }
    }
    Ok((enemy_deaths, own_deaths))
}

/// Classify a replay, logging the decision.
pub fn classify(replay: &DecodedReplay, ctx: &LogContext) -> Result<BattleKind, ClassificationError> {
    if replay.result_summary.is_none() {
        log::debug!("{} BATTLE_KIND kind=incomplete", ctx);
        return Ok(BattleKind::Incomplete);
    }

    if !is_clan_war(replay)? {
        log::debug!("{} BATTLE_KIND kind=other", ctx);
        return Ok(BattleKind::Other);
    }

    let clan = guess_own_clan(replay)?;
    let enemy_clan = guess_enemy_clan(replay)?;
    log::info!(
        "{} BATTLE_KIND kind=clan_war clan={} enemy_clan={}",
        ctx,
        clan,
        enemy_clan
    );
    Ok(BattleKind::ClanWar { clan, enemy_clan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::model::RecorderSummary;
    use serde_json::{json, Value};

    fn replay(section_b: Option<Value>) -> DecodedReplay {
        let recorder: RecorderSummary = serde_json::from_value(json!({
            "playerName": "Alice",
            "mapName": "19_monastery",
            "vehicles": {
                "10": {"name": "Alice", "team": 1},
                "11": {"name": "Anna", "team": 1}
            }
        }))
        .unwrap();

        DecodedReplay {
            block_count: 2,
            recorder_summary: recorder,
            result_summary: section_b.map(|s| ResultSummary::from_section(&s).unwrap()),
            legacy_payload: None,
        }
    }

    fn clan_war(winner: u8, enemy_tags: [&str; 2]) -> Value {
        json!([
            {
                "common": {"winnerTeam": winner},
                "vehicles": {
                    "10": {"accountDBID": 1, "team": 1, "deathReason": -1},
                    "11": {"accountDBID": 2, "team": 1, "deathReason": 0},
                    "20": {"accountDBID": 3, "team": 2, "deathReason": 1},
                    "21": {"accountDBID": 4, "team": 2, "deathReason": 2}
                }
            },
            {
                "10": {"name": "Alice", "team": 1, "clanAbbrev": "AAA", "vehicleType": "ussr:IS-3"},
                "11": {"name": "Anna", "team": 1, "clanAbbrev": "AAA", "vehicleType": "ussr:"},
                "20": {"name": "Bob", "team": 2, "clanAbbrev": enemy_tags[0], "vehicleType": "germany:E-75"},
                "21": {"name": "Bert", "team": 2, "clanAbbrev": enemy_tags[1], "vehicleType": "germany:Maus"}
            }
        ])
    }

    #[test]
    fn test_own_team() {
        assert_eq!(own_team(&replay(None)), Ok(1));
    }

    #[test]
    fn test_own_team_missing() {
        let mut r = replay(None);
        r.recorder_summary.player_name = "Mallory".to_string();
        assert_eq!(
            own_team(&r),
            Err(ClassificationError::OwnTeamNotFound("Mallory".to_string()))
        );
    }

    #[test]
    fn test_team_roster_strips_namespace() {
        let r = replay(Some(clan_war(1, ["BBB", "BBB"])));
        let roster = team_roster(&r, 1).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].vehicle.as_deref(), Some("IS-3"));
        assert_eq!(roster[1].vehicle, None);
    }

    #[test]
    fn test_clan_war_detected() {
        let r = replay(Some(clan_war(1, ["BBB", "BBB"])));
        assert_eq!(is_clan_war(&r), Ok(true));
        assert_eq!(guess_own_clan(&r), Ok("AAA".to_string()));
        assert_eq!(guess_enemy_clan(&r), Ok("BBB".to_string()));
        assert_eq!(
            classify(&r, &LogContext::new("test-batch")),
            Ok(BattleKind::ClanWar {
                clan: "AAA".to_string(),
                enemy_clan: "BBB".to_string()
            })
        );
    }

    #[test]
    fn test_mixed_team_is_not_clan_war() {
        let r = replay(Some(clan_war(1, ["BBB", "CCC"])));
        assert_eq!(is_clan_war(&r), Ok(false));
        assert_eq!(guess_own_clan(&r), Err(ClassificationError::NotClanWar));
        assert_eq!(guess_enemy_clan(&r), Err(ClassificationError::NotClanWar));
        assert_eq!(classify(&r, &LogContext::new("test-batch")), Ok(BattleKind::Other));
    }

    #[test]
    fn test_same_clan_both_sides_is_not_clan_war() {
        let r = replay(Some(clan_war(1, ["AAA", "AAA"])));
        assert_eq!(is_clan_war(&r), Ok(false));
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(battle_outcome(&replay(Some(clan_war(1, ["B", "B"])))), Ok(BattleOutcome::Victory));
        assert_eq!(battle_outcome(&replay(Some(clan_war(2, ["B", "B"])))), Ok(BattleOutcome::Defeat));
        assert_eq!(battle_outcome(&replay(Some(clan_war(0, ["B", "B"])))), Ok(BattleOutcome::Draw));
        assert_eq!(outcome(&replay(Some(clan_war(1, ["B", "B"])))), Ok(true));
        assert_eq!(outcome(&replay(Some(clan_war(0, ["B", "B"])))), Ok(false));
    }

    #[test]
    fn test_score() {
        let r = replay(Some(clan_war(1, ["BBB", "BBB"])));
        assert_eq!(score(&r), Ok((2, 1)));
    }

    #[test]
    fn test_incomplete_replay() {
        let r = replay(None);
        assert_eq!(is_clan_war(&r), Err(ClassificationError::ResultUnavailable));
        assert_eq!(outcome(&r), Err(ClassificationError::ResultUnavailable));
        assert_eq!(score(&r), Err(ClassificationError::ResultUnavailable));
        assert_eq!(team_roster(&r, 1), Err(ClassificationError::ResultUnavailable));
        assert_eq!(classify(&r, &LogContext::new("test-batch")), Ok(BattleKind::Incomplete));
    }

    #[test]
    fn test_roster_from_combatants_without_detail_block() {
        let r = replay(Some(json!({
            "0": {
                "common": {"winnerTeam": 1},
                "vehicles": {
                    "10": {"accountDBID": 1, "team": 1, "clanAbbrev": "AAA", "vehicleType": "ussr:IS-3"},
                    "20": {"accountDBID": 2, "team": 2, "clanAbbrev": "BBB"}
                },
                "players": {"1": {"name": "Alice"}}
            }
        })));

        let roster = team_roster(&r, 1).unwrap();
        assert_eq!(roster[0].name, "Alice");
        assert_eq!(roster[0].vehicle.as_deref(), Some("IS-3"));
        assert_eq!(team_roster(&r, 2).unwrap()[0].name, "");

        assert_eq!(is_clan_war(&r), Ok(true));
        assert_eq!(guess_own_clan(&r), Ok("AAA".to_string()));
        assert_eq!(guess_enemy_clan(&r), Ok("BBB".to_string()));
    }

    #[test]
    fn test_own_team_without_player_name() {
        let mut r = replay(None);
        r.recorder_summary.player_name = String::new();
        r.recorder_summary
            .vehicles
            .get_mut("11")
            .unwrap()
            .name
            .clear();
        assert_eq!(own_team(&r), Err(ClassificationError::OwnTeamNotFound(String::new())));
    }

    #[test]
    fn test_outcome_as_str() {
        assert_eq!(BattleOutcome::Victory.as_str(), "victory");
        assert_eq!(BattleKind::Other.as_str(), "other");
    }
}
