//! Decode and extraction throughput over a synthetic fifteen-a-side replay.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Map};

use whyattend_core::classification::{is_clan_war, score};
use whyattend_core::{decode, extract_performance, TierTable};

fn replay_file() -> Vec<u8> {
    let mut recorder_vehicles = Map::new();
    let mut vehicles = Map::new();
    let mut players = Map::new();
    let mut details = Map::new();

    for i in 0..30u64 {
        let team = if i < 15 { 1 } else { 2 };
        let clan = if team == 1 { "AAA" } else { "BBB" };
        let name = format!("player{}", i);
        let vehicle_id = (1000 + i).to_string();
        let death_reason: i64 = if i % 4 == 0 { 1 } else { -1 };

        if team == 1 {
            recorder_vehicles.insert(vehicle_id.clone(), json!({"name": name, "team": team}));
        }
        vehicles.insert(
            vehicle_id.clone(),
            json!([{
                "accountDBID": 500_000 + i, "team": team, "damageDealt": 150 * i, "kills": i % 3,
                "spotted": i % 2, "damageAssistedRadio": 40 * i, "potentialDamageReceived": 3000,
                "deathReason": death_reason
            }]),
        );
        players.insert((500_000 + i).to_string(), json!({"name": name, "clanAbbrev": clan, "team": team}));
        details.insert(
            vehicle_id,
            json!({"name": name, "team": team, "clanAbbrev": clan, "vehicleType": "ussr:IS-3"}),
        );
    }

    let section_a = json!({"playerName": "player0", "mapName": "19_monastery", "vehicles": recorder_vehicles})
        .to_string();
    let section_b = json!([
        {"common": {"winnerTeam": 1, "duration": 600}, "vehicles": vehicles, "players": players},
        details
    ])
    .to_string();

    let mut out = vec![0x12, 0x32, 0x34, 0x11];
    out.extend_from_slice(&2u32.to_le_bytes());
    for section in [section_a, section_b] {
        out.extend_from_slice(&(section.len() as u32).to_le_bytes());
        out.extend_from_slice(section.as_bytes());
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let file = replay_file();

    c.bench_function("decode", |b| b.iter(|| decode(black_box(&file))));

    let replay = decode(&file).unwrap();
    c.bench_function("classify", |b| {
        b.iter(|| (is_clan_war(black_box(&replay)), score(black_box(&replay))))
    });

    let result = replay.result_summary.as_ref().unwrap();
    let names = result.account_names();
    c.bench_function("extract_performance", |b| {
        b.iter(|| extract_performance(black_box(result), TierTable::builtin(), &names, true))
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
