//! Typed model of the decoded replay sections.
//!
//! Section A (recorder summary) and section B (battle result) arrive as JSON.
//! Both are normalized into the structs below once, at decode time: account
//! and vehicle ids become integers, single-entry lists are flattened and the
//! clan tag / vehicle type of each combatant is joined onto its stats entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extraction::lenient::element;

pub type AccountId = u64;
pub type VehicleId = u64;
pub type TeamId = u8;

/// Death-reason code of a vehicle that survived the battle.
pub const SURVIVED: i64 = -1;

fn survived() -> i64 {
    SURVIVED
}

/// Section A: the recording player's own view of the battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSummary {
    /// Empty when the recorder did not write it.
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub map_name: String,
    #[serde(default)]
    pub map_display_name: Option<String>,
    /// Match start as `dd.mm.YYYY HH:MM:SS`.
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub battle_type: Option<i64>,
    #[serde(default, rename = "playerID")]
    pub player_id: Option<AccountId>,
    #[serde(default)]
    pub client_version_from_exe: Option<String>,
    /// Vehicle id (as written in the file) -> recorder-side vehicle.
    #[serde(default)]
    pub vehicles: BTreeMap<String, RecorderVehicle>,
    /// Keys this model does not name.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderVehicle {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub team: TeamId,
    #[serde(default)]
    pub clan_abbrev: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

/// Battle-wide facts from the result's `common` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonBlock {
    /// 1 or 2; 0 for a draw.
    #[serde(default)]
    pub winner_team: TeamId,
    /// Battle length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub arena_create_time: Option<i64>,
    #[serde(default)]
    pub bonus_type: Option<i64>,
    #[serde(default)]
    pub finish_reason: Option<i64>,
}

impl CommonBlock {
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d as u64)
    }
}

/// One combatant's stats for the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleEntry {
    #[serde(default)]
    pub vehicle_id: VehicleId,
    /// 0 when the entry carries no account.
    #[serde(default, rename = "accountDBID")]
    pub account_dbid: AccountId,
    pub team: TeamId,
    /// `nation:tank`, joined from the vehicle detail block.
    #[serde(default)]
    pub vehicle_type: Option<String>,
    /// Joined from the player block.
    #[serde(default)]
    pub clan_abbrev: Option<String>,
    #[serde(default)]
    pub damage_dealt: i64,
    #[serde(default)]
    pub potential_damage_received: i64,
    #[serde(default)]
    pub damage_assisted_radio: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default)]
    pub shots: i64,
    #[serde(default, alias = "piercings")]
    pub pierced: i64,
    #[serde(default)]
    pub capture_points: i64,
    #[serde(default)]
    pub dropped_capture_points: i64,
    #[serde(default)]
    pub spotted: i64,
    #[serde(default = "survived")]
    pub death_reason: i64,
    #[serde(default)]
    pub xp: i64,
}

impl VehicleEntry {
    pub fn survived(&self) -> bool {
        self.death_reason == SURVIVED
    }
}

/// Account block entry: who drove a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    #[serde(default)]
    pub clan_abbrev: Option<String>,
    #[serde(default)]
    pub team: TeamId,
}

/// Per-vehicle detail block: what each combatant drove, as far as revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub team: TeamId,
    #[serde(default)]
    pub clan_abbrev: Option<String>,
    /// Empty or namespace-less when the vehicle was never spotted.
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub is_alive: Option<bool>,
}

/// Section B: full two-team battle result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub common: CommonBlock,
    /// Combatant stats ordered by vehicle id.
    pub vehicles: Vec<VehicleEntry>,
    pub players: BTreeMap<AccountId, PlayerInfo>,
    pub details: BTreeMap<VehicleId, VehicleDetail>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(VehicleEntry),
    Many(Vec<VehicleEntry>),
}

/// Result element 0, also the shape of the legacy payload's combatant blocks.
#[derive(Deserialize)]
struct RawCombatants {
    #[serde(default)]
    common: Option<CommonBlock>,
    #[serde(default)]
    vehicles: BTreeMap<VehicleId, OneOrMany>,
    #[serde(default)]
    players: BTreeMap<AccountId, PlayerInfo>,
}

impl RawCombatants {
    fn into_entries(self) -> (Option<CommonBlock>, Vec<VehicleEntry>, BTreeMap<AccountId, PlayerInfo>) {
        let mut entries = Vec::new();
        for (vehicle_id, slot) in self.vehicles {
            let list = match slot {
                OneOrMany::One(entry) => vec![entry],
                OneOrMany::Many(list) => list,
            };
            entries.extend(list.into_iter().map(|mut entry| {
                entry.vehicle_id = vehicle_id;
                entry
            }));
        }
        (self.common, entries, self.players)
    }
}

impl ResultSummary {
    /// Normalize a parsed section B.
    ///
    /// Accepts the array layout (`[result, details, ...]`) and the equivalent
    /// object keyed `"0"`, `"1"`. A missing detail element yields an empty
    /// detail block; a missing result element is an error.
    pub fn from_section(section: &Value) -> Result<Self, serde_json::Error> {
        let result = element(section, 0).ok_or_else(|| {
            <serde_json::Error as serde::de::Error>::custom("result element missing")
        })?;
        let raw: RawCombatants = serde_json::from_value(result.clone())?;

        let details: BTreeMap<VehicleId, VehicleDetail> = match element(section, 1) {
            Some(details) => serde_json::from_value(details.clone())?,
            None => BTreeMap::new(),
        };

        let (common, vehicles, players) = raw.into_entries();
        let mut summary = Self {
            common: common.unwrap_or_default(),
            vehicles,
            players,
            details,
        };
        summary.join_identity();
        Ok(summary)
    }

    /// Take combatant stats from a legacy payload when section B carried none.
    ///
    /// Returns true if any entries were taken.
    pub fn backfill_from_legacy(&mut self, legacy: &Value) -> Result<bool, serde_json::Error> {
        if !self.vehicles.is_empty() {
            return Ok(false);
        }
        let raw: RawCombatants = serde_json::from_value(legacy.clone())?;
        let (_, vehicles, players) = raw.into_entries();
        if vehicles.is_empty() {
            return Ok(false);
        }

        self.vehicles = vehicles;
        for (account, info) in players {
            self.players.entry(account).or_insert(info);
        }
        self.join_identity();
        Ok(true)
    }

    /// Account id -> display name, from the player block.
    pub fn account_names(&self) -> BTreeMap<AccountId, String> {
        self.players
            .iter()
            .map(|(account, info)| (*account, info.name.clone()))
            .collect()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    fn join_identity(&mut self) {
        for entry in &mut self.vehicles {
            if entry.vehicle_type.is_none() {
                entry.vehicle_type = self
                    .details
                    .get(&entry.vehicle_id)
                    .and_then(|d| d.vehicle_type.clone());
            }
            if entry.clan_abbrev.is_none() {
                entry.clan_abbrev = self
                    .players
                    .get(&entry.account_dbid)
                    .and_then(|p| p.clan_abbrev.clone())
                    .or_else(|| {
                        self.details
                            .get(&entry.vehicle_id)
                            .and_then(|d| d.clan_abbrev.clone())
                    });
            }
        }
    }
}
