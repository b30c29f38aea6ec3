//! Replay analysis log lines.
//!
//! Every line names the batch, and the replay file when there is one, then an
//! upper-snake event such as `REPLAY_REJECTED` followed by `key=value` pairs:
//!
//! ```text
//! [batch=batch-1a2b3c4d] [replay=20131224_2015_ussr-T-34_19_monastery.wotreplay] REPLAY_REJECTED reason=incomplete
//! ```

use std::fmt;

/// Which upload batch, and which replay file in it, a log line is about.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub batch_id: String,
    pub replay: Option<String>,
}

impl LogContext {
    /// Context for a whole batch, before any replay is picked up.
    pub fn new(batch_id: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            replay: None,
        }
    }

    /// Context for a replay decoded outside any batch, such as a single
    /// upload from the web application. Logged as `[batch=-]`.
    pub fn standalone() -> Self {
        Self::new("-")
    }

    /// Same batch, narrowed to one replay file name.
    pub fn with_replay(&self, replay: &str) -> Self {
        Self {
            batch_id: self.batch_id.clone(),
            replay: Some(replay.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.replay {
            Some(replay) => write!(f, "[batch={}] [replay={}]", self.batch_id, replay),
            None => write!(f, "[batch={}]", self.batch_id),
        }
    }
}

/// `info` line for a batch or replay event, e.g.
/// `log_info!(ctx, "BATCH_COMPLETE", accepted = 3, rejected = 1)`.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::info!(
            concat!("{} {}", $(" ", stringify!($key), "={}"),*),
            $ctx,
            $event
            $(, $value)*
        )
    };
}

/// `warn` line, used when a replay is rejected or degraded.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::warn!(
            concat!("{} {}", $(" ", stringify!($key), "={}"),*),
            $ctx,
            $event
            $(, $value)*
        )
    };
}

/// `error` line.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::error!(
            concat!("{} {}", $(" ", stringify!($key), "={}"),*),
            $ctx,
            $event
            $(, $value)*
        )
    };
}

/// `debug` line for per-replay detail such as extraction counts.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::debug!(
            concat!("{} {}", $(" ", stringify!($key), "={}"),*),
            $ctx,
            $event
            $(, $value)*
        )
    };
}
