//! Replay container decoding.
//!
//! Layout (all lengths little-endian u32):
//!
//! ```text
//! [magic:4][block_count:4][len_a:4][section A][len_b:4][section B]([len_c:4][section C])
//! ```
//!
//! Section A (recorder summary, JSON) must decode or the buffer is rejected.
//! Section B (battle result, JSON) is missing when the recorder left before
//! the battle ended. Section C (legacy payload) only exists when
//! `block_count == 3`. Failures in B or C degrade to absence.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::logging::structured::LogContext;

use super::legacy::unpickle;
use super::model::{RecorderSummary, ResultSummary};

/// Block count of files that carry the legacy payload.
pub const LEGACY_BLOCK_COUNT: u32 = 3;

const HEADER_LEN: usize = 8;

/// Smallest buffer that can hold the header and the section A length.
pub const MIN_REPLAY_LEN: usize = HEADER_LEN + 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Section A is not UTF-8 JSON, or not a JSON object.
    #[error("not a replay file: {0}")]
    NotAReplay(String),

    /// The header or section A extends past the end of the buffer.
    #[error("truncated replay: {needed} bytes needed at offset {offset}, buffer holds {len}")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        len: usize,
    },
}

/// Immutable result of decoding one replay buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedReplay {
    pub block_count: u32,
    pub recorder_summary: RecorderSummary,
    /// Absent when the battle was left before it ended.
    pub result_summary: Option<ResultSummary>,
    /// Absent unless the file predates the pure-JSON layout and the block
    /// could be read.
    pub legacy_payload: Option<Value>,
}

impl DecodedReplay {
    pub fn is_complete(&self) -> bool {
        self.result_summary.is_some()
    }
}

/// Decode a replay buffer.
pub fn decode(buffer: &[u8]) -> Result<DecodedReplay, DecodeError> {
    decode_with_context(buffer, &LogContext::standalone())
}

/// Decode a replay buffer, logging under the given context.
pub fn decode_with_context(buffer: &[u8], ctx: &LogContext) -> Result<DecodedReplay, DecodeError> {
    let mut reader = SectionReader::new(buffer);

    // Magic is not checked beyond being present.
    reader.read_bytes(4)?;
    let block_count = reader.read_u32()?;
    let section_a = reader.read_section()?;
    let recorder_summary = parse_recorder_summary(section_a)?;

    log::debug!(
        "{} SECTION_A_DECODED blocks={} player={} map={}",
        ctx,
        block_count,
        recorder_summary.player_name,
        recorder_summary.map_name
    );

    let section_b = match reader.read_section() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("{} SECTION_B_MISSING error={}", ctx, e);
            None
        }
    };
    let mut result_summary = section_b.and_then(|bytes| parse_result_summary(bytes, ctx));

    let legacy_payload = if block_count == LEGACY_BLOCK_COUNT && section_b.is_some() {
        read_legacy_payload(&mut reader, ctx)
    } else {
        None
    };

    if let (Some(result), Some(legacy)) = (result_summary.as_mut(), legacy_payload.as_ref()) {
        match result.backfill_from_legacy(legacy) {
            Ok(true) => log::debug!(
                "{} COMBATANTS_FROM_LEGACY vehicles={}",
                ctx,
                result.vehicle_count()
            ),
            Ok(false) => {}
            Err(e) => log::warn!("{} LEGACY_COMBATANTS_UNREADABLE error={}", ctx, e),
        }
    }

    log::info!(
        "{} REPLAY_DECODED blocks={} result={} legacy={}",
        ctx,
        block_count,
        result_summary.is_some(),
        legacy_payload.is_some()
    );

    Ok(DecodedReplay {
        block_count,
        recorder_summary,
        result_summary,
        legacy_payload,
    })
}

fn parse_recorder_summary(bytes: &[u8]) -> Result<RecorderSummary, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::NotAReplay(format!("section A is not UTF-8: {}", e)))?;
    serde_json::from_str(text)
        .map_err(|e| DecodeError::NotAReplay(format!("section A is not a recorder summary: {}", e)))
}

fn parse_result_summary(bytes: &[u8], ctx: &LogContext) -> Option<ResultSummary> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{} SECTION_B_UNREADABLE reason=utf8 error={}", ctx, e);
            return None;
        }
    };
    let section: Value = match serde_json::from_str(text) {
        Ok(section) => section,
        Err(e) => {
            log::warn!("{} SECTION_B_UNREADABLE reason=json error={}", ctx, e);
            return None;
        }
    };
    match ResultSummary::from_section(&section) {
        Ok(summary) => Some(summary),
        Err(e) => {
            log::warn!("{} SECTION_B_UNREADABLE reason=schema error={}", ctx, e);
            None
        }
    }
}

fn read_legacy_payload(reader: &mut SectionReader<'_>, ctx: &LogContext) -> Option<Value> {
    let bytes = match reader.read_section() {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("{} LEGACY_PAYLOAD_MISSING error={}", ctx, e);
            return None;
        }
    };
    match unpickle(bytes) {
        Ok(payload) => Some(payload),
        Err(e) => {
            log::warn!(
                "{} LEGACY_PAYLOAD_UNREADABLE size={} error={}",
                ctx,
                bytes.len(),
                e
            );
            None
        }
    }
}

/// Cursor over length-prefixed sections.
struct SectionReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let buf: &'a [u8] = self.buf;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or(DecodeError::TruncatedBuffer {
                offset: self.pos,
                needed: len,
                len: buf.len(),
            })?;
        let bytes = &buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Length prefix plus body. On failure the cursor does not move.
    fn read_section(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let section = self
            .read_u32()
            .and_then(|len| self.read_bytes(len as usize));
        if section.is_err() {
            self.pos = start;
        }
        section
    }
}
