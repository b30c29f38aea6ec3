//! Per-player performance extraction.
//!
//! Joins the battle result's combatant stats with the vehicle detail block
//! and the tier table. Combatants whose vehicle was never revealed in the
//! detail block have no tier and are left out.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::logging::structured::LogContext;
use crate::replay::model::{AccountId, ResultSummary};
use crate::tiers::table::{strip_namespace, TierTable};

/// One player's showing in one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPerformance {
    pub tier: u8,
    pub damage_dealt: i64,
    pub potential_damage_received: i64,
    pub damage_assisted_radio: i64,
    pub kills: i64,
    pub spotted: i64,
    pub dropped_capture_points: i64,
    pub capture_points: i64,
    pub shots: i64,
    pub pierced: i64,
    pub xp: i64,
    pub survived: bool,
    /// Battle outcome from the recorder's side, copied onto every entry.
    pub win: bool,
}

/// Extract performance for every combatant with a resolvable name and tier.
///
/// `account_to_name` maps account ids to display names; the detail block is
/// keyed by display name, so accounts missing from it are skipped. An account
/// listed twice keeps its last entry. `victory` is the battle outcome as seen
/// by the recorder and becomes `win` on every entry, enemies included.
pub fn extract_performance(
    result: &ResultSummary,
    tiers: &TierTable,
    account_to_name: &BTreeMap<AccountId, String>,
    victory: bool,
) -> HashMap<AccountId, PlayerPerformance> {
    extract_performance_with_context(result, tiers, account_to_name, victory, &LogContext::standalone())
}

pub fn extract_performance_with_context(
    result: &ResultSummary,
    tiers: &TierTable,
    account_to_name: &BTreeMap<AccountId, String>,
    victory: bool,
    ctx: &LogContext,
) -> HashMap<AccountId, PlayerPerformance> {
    let tier_by_name = tiers_by_player_name(result, tiers);

    let mut performance = HashMap::new();
    let mut skipped = 0usize;

    for entry in &result.vehicles {
        let tier = account_to_name
            .get(&entry.account_dbid)
            .and_then(|name| tier_by_name.get(name.as_str()));

        let Some(&tier) = tier else {
            skipped += 1;
            continue;
        };

        performance.insert(
            entry.account_dbid,
            PlayerPerformance {
                tier,
                damage_dealt: entry.damage_dealt,
                potential_damage_received: entry.potential_damage_received,
                damage_assisted_radio: entry.damage_assisted_radio,
                kills: entry.kills,
                spotted: entry.spotted,
                dropped_capture_points: entry.dropped_capture_points,
                capture_points: entry.capture_points,
                shots: entry.shots,
                pierced: entry.pierced,
                xp: entry.xp,
                survived: entry.survived(),
                win: victory,
            },
        );
    }

    log::debug!(
        "{} PERFORMANCE_EXTRACTED players={} skipped={}",
        ctx,
        performance.len(),
        skipped
    );

    performance
}

/// Display name -> tier of the vehicle that player drove, for revealed vehicles.
fn tiers_by_player_name<'a>(result: &'a ResultSummary, tiers: &TierTable) -> HashMap<&'a str, u8> {
    result
        .details
        .values()
        .filter_map(|detail| {
            let id = detail.vehicle_type.as_deref().and_then(strip_namespace)?;
            Some((detail.name.as_str(), tiers.tier_of(id)))
        })
        .collect()
}
