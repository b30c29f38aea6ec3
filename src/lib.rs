//! whyattend core - Battle replay decoding and performance analytics
//!
//! This crate turns uploaded battle replay files into the facts a clan
//! attendance tracker records (map, date, clans, outcome, score, lineup) and
//! into per-player performance statistics with a composite skill rating.
//! With the `python` feature it is exposed to the web application via PyO3.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `replay` - Container decoding into typed sections, legacy payload reader
//! - `classification` - Teams, clan-war detection, outcome, score, battle identity
//! - `extraction` - Per-player performance from a battle result
//! - `rating` - Aggregation across battles and the WN7 rating
//! - `tiers` - Vehicle tier table and map names
//! - `pipeline` - Batch analysis orchestrator
//! - `logging` - Structured logging with batch/replay context
//!
//! ```no_run
//! use whyattend_core::{classification, decode};
//!
//! let bytes = std::fs::read("20131224_2015_ussr-T-34_19_monastery.wotreplay").unwrap();
//! let replay = decode(&bytes).unwrap();
//! if replay.is_complete() && classification::is_clan_war(&replay).unwrap() {
//!     println!("won: {}", classification::outcome(&replay).unwrap());
//! }
//! ```

pub mod classification;
pub mod extraction;
pub mod logging;
pub mod pipeline;
pub mod rating;
pub mod replay;
pub mod tiers;

pub use classification::ClassificationError;
pub use extraction::{extract_performance, PlayerPerformance};
pub use pipeline::{process_batch, BatchContext, BatchResult, BattleSummary};
pub use rating::{aggregate, composite_rating, AggregatePerformance, BattlePerformance, Player};
pub use replay::{decode, DecodeError, DecodedReplay};
pub use tiers::{TierTable, DEFAULT_TIER};

/// Initialize the process-wide logger. Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use pyo3::types::{PyDict, PyList};

    use crate::init_logger;
    use crate::logging::structured::LogContext;
    use crate::pipeline::{process_batch, summarize, BatchContext};
    use crate::rating::Player;
    use crate::replay::{decode_with_context, DecodedReplay};
    use crate::tiers::TierTable;

    fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
        serde_json::to_string(value).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn decode_bytes(data: &[u8]) -> PyResult<DecodedReplay> {
        decode_with_context(data, &LogContext::standalone()).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Decode a replay file.
    ///
    /// Returns the decoded sections as a JSON string; raises ValueError if
    /// the bytes are not a replay.
    #[pyfunction]
    fn decode_replay(data: &[u8]) -> PyResult<String> {
        init_logger();
        to_json(&decode_bytes(data)?)
    }

    /// Battle record facts (map, date, clans, outcome, score, lineup) as JSON.
    #[pyfunction]
    fn summarize_replay(data: &[u8]) -> PyResult<String> {
        init_logger();
        let replay = decode_bytes(data)?;
        let summary = summarize(&replay, &LogContext::standalone())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        to_json(&summary)
    }

    /// Per-account performance of one replay as JSON; empty if the replay is
    /// incomplete.
    #[pyfunction]
    fn player_performance(data: &[u8]) -> PyResult<String> {
        init_logger();
        let replay = decode_bytes(data)?;
        let victory = crate::classification::outcome(&replay).unwrap_or(false);
        let performance = match &replay.result_summary {
            Some(result) => {
                crate::extraction::extract_performance(result, TierTable::builtin(), &result.account_names(), victory)
            }
            None => Default::default(),
        };
        to_json(&performance)
    }

    /// Tier of a vehicle text id such as `T-34` or `ussr:T-34`.
    #[pyfunction]
    fn tank_tier(vehicle: &str) -> u8 {
        let id = crate::tiers::strip_namespace(vehicle).unwrap_or(vehicle);
        TierTable::builtin().tier_of(id)
    }

    /// Analyze a batch of replays for a roster.
    ///
    /// # Arguments
    /// * `replays` - List of (file name, file bytes)
    /// * `players` - List of (player_id, display_name, account_id)
    /// * `require_clan_war` - Reject replays that are not clan wars
    ///
    /// # Returns
    /// Dict with counts, per-replay results and the per-player report
    #[pyfunction]
    #[pyo3(signature = (replays, players, require_clan_war=false))]
    fn process_replay_batch(
        py: Python<'_>,
        replays: Vec<(String, Vec<u8>)>,
        players: Vec<(i64, String, u64)>,
        require_clan_war: bool,
    ) -> PyResult<Py<PyAny>> {
        init_logger();

        let roster = players
            .into_iter()
            .map(|(player_id, display_name, account_id)| Player {
                player_id,
                display_name,
                account_id,
            })
            .collect();
        let ctx = BatchContext::new(roster).with_require_clan_war(require_clan_war);

        log::info!(
            "{} BATCH_RECEIVED replays={} players={}",
            ctx.log_context(),
            replays.len(),
            ctx.players.len()
        );

        let result = process_batch(&ctx, replays);

        let py_result = PyDict::new(py);
        py_result.set_item("batch_id", &ctx.batch_id)?;
        py_result.set_item("received_count", result.received_count)?;
        py_result.set_item("accepted_count", result.accepted_count)?;
        py_result.set_item("rejected_count", result.rejected_count)?;

        let replays_list = PyList::empty(py);
        for replay in &result.replays {
            let replay_dict = PyDict::new(py);
            replay_dict.set_item("name", &replay.name)?;
            replay_dict.set_item("accepted", replay.accepted)?;
            if let Some(reason) = &replay.rejection_reason {
                replay_dict.set_item("rejection_reason", reason)?;
            }
            if let Some(battle) = &replay.battle {
                replay_dict.set_item("battle", to_json(battle)?)?;
            }
            replay_dict.set_item("performance", to_json(&replay.performance)?)?;
            replays_list.append(replay_dict)?;
        }
        py_result.set_item("replays", replays_list)?;

        let report_dict = PyDict::new(py);
        for (player, aggregate) in &result.report {
            report_dict.set_item(player.player_id, to_json(aggregate)?)?;
        }
        py_result.set_item("report", report_dict)?;

        Ok(py_result.into())
    }

    /// Python module definition
    #[pymodule]
    fn whyattend_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(decode_replay, m)?)?;
        m.add_function(wrap_pyfunction!(summarize_replay, m)?)?;
        m.add_function(wrap_pyfunction!(player_performance, m)?)?;
        m.add_function(wrap_pyfunction!(tank_tier, m)?)?;
        m.add_function(wrap_pyfunction!(process_replay_batch, m)?)?;
        Ok(())
    }
}
