//! Performance aggregation across battles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::extraction::performance::PlayerPerformance;
use crate::replay::model::AccountId;

use super::wn7::{composite_rating, RatingInputs};

/// A tracked player as known to the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub player_id: i64,
    pub display_name: String,
    pub account_id: AccountId,
}

/// Per-player performance of one battle plus its outcome for the tracked side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattlePerformance {
    pub victory: bool,
    pub players: HashMap<AccountId, PlayerPerformance>,
}

/// Means over the battles a player appears in.
///
/// All zero for a player without battles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatePerformance {
    pub battle_count: u32,
    pub avg_dmg: f64,
    pub avg_kills: f64,
    pub survival_rate: f64,
    pub avg_spotted: f64,
    pub avg_spot_damage: f64,
    pub avg_pot_damage: f64,
    pub win_rate: f64,
    pub avg_decap: f64,
    pub avg_tier: f64,
    pub rating: f64,
}

impl AggregatePerformance {
    pub fn rating_inputs(&self) -> RatingInputs {
        RatingInputs {
            avg_tier: self.avg_tier,
            avg_kills: self.avg_kills,
            avg_dmg: self.avg_dmg,
            avg_spotted: self.avg_spotted,
            avg_decap: self.avg_decap,
            win_rate: self.win_rate,
            battle_count: self.battle_count,
        }
    }
}

/// Running sums. Stats come from untrusted files, so they are summed as
/// floats and counts saturate.
#[derive(Default)]
struct Totals {
    battles: u32,
    damage: f64,
    kills: f64,
    survived: u32,
    spotted: f64,
    spot_damage: f64,
    pot_damage: f64,
    wins: u32,
    decap: f64,
    tier: f64,
}

impl Totals {
    fn add(&mut self, perf: &PlayerPerformance, victory: bool) {
        self.battles = self.battles.saturating_add(1);
        self.damage += perf.damage_dealt as f64;
        self.kills += perf.kills as f64;
        self.survived = self.survived.saturating_add(u32::from(perf.survived));
        self.spotted += perf.spotted as f64;
        self.spot_damage += perf.damage_assisted_radio as f64;
        self.pot_damage += perf.potential_damage_received as f64;
        self.wins = self.wins.saturating_add(u32::from(victory));
        self.decap += perf.dropped_capture_points as f64;
        self.tier += f64::from(perf.tier);
    }

    fn finish(&self) -> AggregatePerformance {
        if self.battles == 0 {
            return AggregatePerformance::default();
        }
        let n = f64::from(self.battles);
        let mut aggregate = AggregatePerformance {
            battle_count: self.battles,
            avg_dmg: self.damage / n,
            avg_kills: self.kills / n,
            survival_rate: f64::from(self.survived) / n,
            avg_spotted: self.spotted / n,
            avg_spot_damage: self.spot_damage / n,
            avg_pot_damage: self.pot_damage / n,
            win_rate: f64::from(self.wins) / n,
            avg_decap: self.decap / n,
            avg_tier: self.tier / n,
            rating: 0.0,
        };
        aggregate.rating = composite_rating(&aggregate.rating_inputs()).unwrap_or(0.0);
        aggregate
    }
}

/// Fold battles into one aggregate per tracked player.
///
/// Every player in `players` appears in the report. Wins count the battle's
/// outcome, not the player's own `win` flag. Duplicate battles are counted
/// twice.
pub fn aggregate(battles: &[BattlePerformance], players: &[Player]) -> HashMap<Player, AggregatePerformance> {
    let mut totals: HashMap<AccountId, Totals> = players
        .iter()
        .map(|p| (p.account_id, Totals::default()))
        .collect();

    for battle in battles {
        for (account, perf) in &battle.players {
            if let Some(entry) = totals.get_mut(account) {
                entry.add(perf, battle.victory);
            }
        }
    }

    players
        .iter()
        .map(|player| {
            let aggregate = totals
                .get(&player.account_id)
                .map(Totals::finish)
                .unwrap_or_default();
            (player.clone(), aggregate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(account_id: AccountId, name: &str) -> Player {
        Player {
            player_id: account_id as i64 * 10,
            display_name: name.to_string(),
            account_id,
        }
    }

    fn perf(damage: i64, kills: i64, survived: bool) -> PlayerPerformance {
        PlayerPerformance {
            tier: 8,
            damage_dealt: damage,
            potential_damage_received: 3000,
            damage_assisted_radio: 400,
            kills,
            spotted: 2,
            dropped_capture_points: 10,
            capture_points: 0,
            shots: 10,
            pierced: 7,
            xp: 500,
            survived,
            win: false,
        }
    }

    fn battle(victory: bool, entries: &[(AccountId, PlayerPerformance)]) -> BattlePerformance {
        BattlePerformance {
            victory,
            players: entries.iter().copied().collect(),
        }
    }

    #[test]
    fn test_single_battle_averages_equal_raw_values() {
        let alice = player(1, "Alice");
        let report = aggregate(&[battle(true, &[(1, perf(1500, 2, true))])], &[alice.clone()]);

        let agg = report[&alice];
        assert_eq!(agg.battle_count, 1);
        assert_eq!(agg.avg_dmg, 1500.0);
        assert_eq!(agg.avg_kills, 2.0);
        assert_eq!(agg.survival_rate, 1.0);
        assert_eq!(agg.avg_spotted, 2.0);
        assert_eq!(agg.avg_spot_damage, 400.0);
        assert_eq!(agg.avg_pot_damage, 3000.0);
        assert_eq!(agg.win_rate, 1.0);
        assert_eq!(agg.avg_decap, 10.0);
        assert_eq!(agg.avg_tier, 8.0);
        assert!(agg.rating > 0.0);
    }

    #[test]
    fn test_duplicate_battle_counted_twice() {
        let alice = player(1, "Alice");
        let once = battle(false, &[(1, perf(900, 1, false))]);
        let single = aggregate(std::slice::from_ref(&once), &[alice.clone()])[&alice];
        let double = aggregate(&[once.clone(), once], &[alice.clone()])[&alice];

        assert_eq!(double.battle_count, 2);
        assert_eq!(double.avg_dmg, single.avg_dmg);
        assert_eq!(double.avg_kills, single.avg_kills);
        assert_eq!(double.win_rate, single.win_rate);
    }

    #[test]
    fn test_absent_player_gets_zero_aggregate() {
        let alice = player(1, "Alice");
        let bob = player(2, "Bob");
        let report = aggregate(&[battle(true, &[(1, perf(1000, 1, true))])], &[alice, bob.clone()]);

        assert_eq!(report.len(), 2);
        assert_eq!(report[&bob], AggregatePerformance::default());
    }

    #[test]
    fn test_untracked_accounts_ignored() {
        let alice = player(1, "Alice");
        let report = aggregate(
            &[battle(true, &[(1, perf(1000, 1, true)), (99, perf(5000, 9, true))])],
            &[alice.clone()],
        );

        assert_eq!(report.len(), 1);
        assert_eq!(report[&alice].avg_dmg, 1000.0);
    }

    #[test]
    fn test_win_rate_uses_battle_outcome() {
        let alice = player(1, "Alice");
        let mut won = perf(1000, 1, true);
        won.win = true;
        let battles = [
            battle(true, &[(1, perf(1000, 1, true))]),
            battle(false, &[(1, won)]),
            battle(false, &[(1, perf(1000, 1, true))]),
            battle(true, &[(2, perf(1000, 1, true))]),
        ];

        let agg = aggregate(&battles, &[alice.clone()])[&alice];
        assert_eq!(agg.battle_count, 3);
        assert!((agg.win_rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let alice = player(1, "Alice");
        let mut huge = perf(i64::MAX, i64::MAX, true);
        huge.damage_assisted_radio = i64::MAX;
        huge.potential_damage_received = i64::MAX;
        let battles = [battle(true, &[(1, huge)]), battle(true, &[(1, huge)])];

        let agg = aggregate(&battles, &[alice.clone()])[&alice];
        assert_eq!(agg.battle_count, 2);
        assert_eq!(agg.avg_dmg, i64::MAX as f64);
        assert_eq!(agg.avg_kills, i64::MAX as f64);
        assert_eq!(agg.avg_spot_damage, i64::MAX as f64);

        let mut negative = perf(i64::MIN, 0, true);
        negative.kills = i64::MIN;
        let agg = aggregate(&[battle(false, &[(1, negative)]), battle(false, &[(1, negative)])], &[alice.clone()])[&alice];
        assert_eq!(agg.avg_dmg, i64::MIN as f64);
    }

    #[test]
    fn test_rating_matches_composite() {
        let alice = player(1, "Alice");
        let agg = aggregate(&[battle(true, &[(1, perf(1200, 1, false))])], &[alice.clone()])[&alice];

        assert_eq!(Some(agg.rating), composite_rating(&agg.rating_inputs()));
    }
}
