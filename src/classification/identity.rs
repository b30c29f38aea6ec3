//! Battle identity.
//!
//! Recognizing the same battle across replays recorded by different players
//! of one team.

use std::collections::BTreeSet;

use sha1::{Digest, Sha1};

use crate::replay::container::DecodedReplay;

use super::battle::{guess_enemy_clan, own_team, ClassificationError};

/// Names of the recorder-side vehicles on the recording player's team.
pub fn player_team(replay: &DecodedReplay) -> Result<Vec<String>, ClassificationError> {
    let team = own_team(replay)?;
    Ok(replay
        .recorder_summary
        .vehicles
        .values()
        .filter(|v| v.team == team)
        .map(|v| v.name.clone())
        .collect())
}

/// SHA-1 over the sorted own-team names, the enemy clan and the map id.
///
/// Every replay of one clan-war battle recorded by the same lineup hashes
/// alike, which is how untracked replays are spotted.
pub fn battle_checksum(replay: &DecodedReplay) -> Result<String, ClassificationError> {
    let mut names = player_team(replay)?;
    names.sort();
    let enemy_clan = guess_enemy_clan(replay)?;

    let mut hasher = Sha1::new();
    hasher.update(names.concat().as_bytes());
    hasher.update(enemy_clan.as_bytes());
    hasher.update(replay.recorder_summary.map_name.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Whether two replays record the same battle: same map and same own-team
/// lineup.
pub fn is_same_battle(a: &DecodedReplay, b: &DecodedReplay) -> Result<bool, ClassificationError> {
    if a.recorder_summary.map_name != b.recorder_summary.map_name {
        return Ok(false);
    }
    let team_a: BTreeSet<String> = player_team(a)?.into_iter().collect();
    let team_b: BTreeSet<String> = player_team(b)?.into_iter().collect();
    Ok(team_a == team_b)
}
