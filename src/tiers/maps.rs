//! Map id -> English display name.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Display name used when neither the table nor the replay names the map.
pub const UNKNOWN_MAP: &str = "Unknown";

lazy_static! {
    static ref MAP_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("00_tank_tutorial", "Training area"),
        ("01_karelia", "Karelia"),
        ("02_malinovka", "Malinovka"),
        ("03_campania", "Province"),
        ("04_himmelsdorf", "Himmelsdorf"),
        ("05_prohorovka", "Prokhorovka"),
        ("06_ensk", "Ensk"),
        ("07_lakeville", "Lakeville"),
        ("08_ruinberg", "Ruinberg"),
        ("10_hills", "Mines"),
        ("11_murovanka", "Murovanka"),
        ("13_erlenberg", "Erlenberg"),
        ("14_siegfried_line", "Siegfried Line"),
        ("15_komarin", "Komarin"),
        ("17_munchen", "Widepark"),
        ("18_cliff", "Cliff"),
        ("19_monastery", "Abbey"),
        ("22_slough", "Swamp"),
        ("23_westfeld", "Westfield"),
        ("28_desert", "Sand River"),
        ("29_el_hallouf", "El Halluf"),
        ("31_airfield", "Airfield"),
        ("33_fjord", "Fjords"),
        ("34_redshire", "Redshire"),
        ("35_steppes", "Steppes"),
        ("36_fishing_bay", "Fisherman's Bay"),
        ("37_caucasus", "Mountain Pass"),
        ("38_mannerheim_line", "Arctic Region"),
        ("39_crimea", "South Coast"),
        ("42_north_america", "Port"),
        ("44_north_america", "Live Oaks"),
        ("45_north_america", "Highway"),
        ("47_canada_a", "Serene Coast"),
        ("51_asia", "Dragon Ridge"),
        ("60_asia_miao", "Pearl River"),
        ("73_asia_korea", "Sacred Valley"),
        ("85_winter", "Belogorsk-19"),
    ]);
}

/// English name of a map id, if known.
pub fn map_display_name(map_id: &str) -> Option<&'static str> {
    MAP_NAMES.get(map_id).copied()
}
