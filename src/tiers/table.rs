//! Vehicle tier lookup.
//!
//! Maps a vehicle's text id (the part of `nation:tank` after the colon) to
//! its tier. Vehicles missing from the table are rated as top tier.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::Value;

/// Tier assumed for vehicles the table does not know.
pub const DEFAULT_TIER: u8 = 10;

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 10;

/// Vehicle text id -> tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierTable {
    tiers: HashMap<String, u8>,
}

impl TierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(text_id, tier)` pairs. Tiers outside 1-10 are dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (id, tier) in entries {
            table.insert(id, tier);
        }
        table
    }

    /// Build a table from a vehicle encyclopedia response:
    /// `{"data": {"<id>": {"name": "ussr:T-34", "level": 5}, ...}}`.
    ///
    /// Entries without a namespaced name or with an out-of-range level are skipped.
    pub fn from_encyclopedia_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Response {
            data: HashMap<String, Value>,
        }

        let response: Response = serde_json::from_str(json)?;
        let mut table = Self::new();
        let mut skipped = 0usize;

        for entry in response.data.values() {
            let name = entry.get("name").and_then(|n| n.as_str());
            let level = entry
                .get("level")
                .and_then(|l| l.as_u64())
                .and_then(|l| u8::try_from(l).ok());

            let inserted = match (name.and_then(strip_namespace), level) {
                (Some(id), Some(level)) => table.insert(id, level),
                _ => false,
            };
            if !inserted {
                skipped += 1;
            }
        }

        log::info!(
            "TIER_TABLE_LOADED vehicles={} skipped={}",
            table.len(),
            skipped
        );

        Ok(table)
    }

    /// Insert a vehicle. Returns false (and leaves the table untouched) for
    /// tiers outside 1-10.
    pub fn insert(&mut self, id: impl Into<String>, tier: u8) -> bool {
        if !(MIN_TIER..=MAX_TIER).contains(&tier) {
            return false;
        }
        self.tiers.insert(id.into(), tier);
        true
    }

    /// Tier for a vehicle text id, `DEFAULT_TIER` when unknown.
    pub fn tier_of(&self, id: &str) -> u8 {
        self.tiers.get(id).copied().unwrap_or(DEFAULT_TIER)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tiers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// The compiled-in table.
    pub fn builtin() -> &'static TierTable {
        &BUILTIN_TIERS
    }
}

/// Strip the `nation:` prefix of a vehicle type string.
///
/// Returns `None` when there is no colon or nothing follows it, which is how
/// unrevealed vehicles show up in replays.
pub fn strip_namespace(vehicle_type: &str) -> Option<&str> {
    match vehicle_type.split_once(':') {
        Some((_, id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

lazy_static! {
    static ref BUILTIN_TIERS: TierTable = TierTable::from_entries(BUILTIN_ENTRIES.iter().copied());
}

const BUILTIN_ENTRIES: &[(&str, u8)] = &[
    // ussr
    ("MS-1", 1),
    ("T-26", 2),
    ("BT-2", 2),
    ("SU-18", 2),
    ("AT-1", 2),
    ("T-46", 3),
    ("BT-7", 3),
    ("SU-26", 3),
    ("SU-76", 3),
    ("A-20", 4),
    ("T-28", 4),
    ("SU-5", 4),
    ("SU-85B", 4),
    ("T-34", 5),
    ("KV-1", 5),
    ("T-50-2", 5),
    ("SU-85", 5),
    ("KV-2", 6),
    ("KV-1s", 6),
    ("T-34-85", 6),
    ("SU-100", 6),
    ("SU-8", 6),
    ("T-43", 7),
    ("KV-3", 7),
    ("IS", 7),
    ("SU-152", 7),
    ("S-51", 7),
    ("SU-14", 8),
    ("T-44", 8),
    ("IS-3", 8),
    ("KV-4", 8),
    ("ISU-152", 8),
    ("SU-101", 8),
    ("T-54", 9),
    ("IS-8", 9),
    ("ST-I", 9),
    ("Object_704", 9),
    ("Object_212", 9),
    ("T-62A", 10),
    ("Object_140", 10),
    ("Object_430", 10),
    ("IS-7", 10),
    ("IS-4", 10),
    ("Object_268", 10),
    ("Object_263", 10),
    ("Object_261", 10),
    // germany
    ("Ltraktor", 1),
    ("PzII", 2),
    ("PzIII_A", 3),
    ("PzIII", 4),
    ("PzIV", 5),
    ("VK3001H", 5),
    ("Hummel", 6),
    ("VK3601H", 6),
    ("VK2801", 6),
    ("JagdPzIV", 6),
    ("PzV_PzIV", 6),
    ("PzVI", 7),
    ("VK3002DB", 7),
    ("JagdPanther", 7),
    ("GW_Panther", 7),
    ("PzV", 8),
    ("PzVIB_Tiger_II", 8),
    ("Lowe", 8),
    ("Ferdinand", 8),
    ("GW_Tiger_P", 8),
    ("VK4502A", 8),
    ("E-50", 9),
    ("E-75", 9),
    ("JagdTiger", 9),
    ("G_Tiger", 9),
    ("E-50_Ausf_M", 10),
    ("E-100", 10),
    ("Maus", 10),
    ("VK4502P", 10),
    ("JagdPz_E100", 10),
    ("G_E", 10),
    ("Leopard1", 10),
    // usa
    ("T1_Cunningham", 1),
    ("M2_lt", 2),
    ("M3_Stuart", 3),
    ("M5_Stuart", 4),
    ("M7_med", 5),
    ("M4_Sherman", 5),
    ("M24_Chaffee", 5),
    ("M4A3E8_Sherman", 6),
    ("M36_Slagger", 6),
    ("T20", 7),
    ("T29", 7),
    ("M12", 7),
    ("T25_AT", 7),
    ("M26_Pershing", 8),
    ("T32", 8),
    ("T28", 8),
    ("M40M43", 8),
    ("M46_Patton", 9),
    ("M103", 9),
    ("T95", 9),
    ("T30", 9),
    ("M48A1", 10),
    ("M60", 10),
    ("T110", 10),
    ("T57_58", 10),
    ("T110E4", 10),
    ("T110E3", 10),
    ("T92", 10),
    // france
    ("RenaultFT", 1),
    ("AMX38", 3),
    ("AMX40", 4),
    ("AMX_12t", 6),
    ("AMX_13_75", 7),
    ("AMX_13_90", 8),
    ("Lorraine40t", 9),
    ("AMX_50_100", 8),
    ("AMX_50_120", 9),
    ("AMX_M4_1945", 7),
    ("Bat_Chatillon25t", 10),
    ("F10_AMX_50B", 10),
    ("AMX_50Fosh_155", 10),
    ("Bat_Chatillon155", 10),
    ("AMX_Foch_155", 10),
    // uk
    ("Cromwell", 6),
    ("Comet", 7),
    ("Centurion_Mk_I", 8),
    ("Centurion_Mk_7_1", 9),
    ("FV4202", 10),
    ("Caernarvon", 8),
    ("Conqueror", 9),
    ("FV215b", 10),
    ("FV215b_183", 10),
    ("FV4005", 10),
    // china
    ("Ch01_Type59", 8),
    ("Ch18_WZ-120", 9),
    ("Ch19_121", 10),
    ("Ch22_113", 10),
    ("Ch24_Type64", 6),
];
