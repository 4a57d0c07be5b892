use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::configuration::types::Endpoint;
use crate::data_capture::types::{CloseReason, Direction};

/// Version of the on-disk run directory layout.
pub const FORMAT_VERSION: u32 = 1;

/// One line of `events.jsonl`: a forwarded chunk and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: u64,
    pub direction: Direction,
    #[serde(rename = "bytes")]
    pub byte_count: u64,
    /// Nanoseconds on the monotonic clock since the session started.
    #[serde(rename = "ts_ns")]
    pub timestamp_ns: u64,
    #[serde(rename = "file")]
    pub blob: String,
}

impl ChunkRecord {
    /// Blob name for a chunk, e.g. `0007_s2c.bin`.
    pub fn blob_name(index: u64, direction: Direction) -> String {
        format!("{:04}_{}.bin", index, direction.tag())
    }
}

/// Terminal status of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ok,
    Interrupted,
    Error,
}

impl From<CloseReason> for SessionStatus {
    fn from(reason: CloseReason) -> Self {
        match reason {
            CloseReason::ClientClosed | CloseReason::ServerClosed => SessionStatus::Ok,
            CloseReason::Interrupted => SessionStatus::Interrupted,
            CloseReason::Error => SessionStatus::Error,
        }
    }
}

/// `summary.json`, written exactly once per capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_ns: i64,
    pub end_ns: i64,
    pub duration_ms: u64,
    pub chunks: u64,
    pub bytes_c2s: u64,
    pub bytes_s2c: u64,
    pub status: SessionStatus,
    pub close_reason: CloseReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionSummary {
    pub fn bytes(&self, direction: Direction) -> u64 {
        match direction {
            Direction::ClientToServer => self.bytes_c2s,
            Direction::ServerToClient => self.bytes_s2c,
        }
    }
}

/// `manifest.json` describing where a capture came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub scenario: String,
    pub run_id: String,
    pub session_id: Uuid,
    pub listen: Endpoint,
    pub target: Endpoint,
    pub created_at: DateTime<Utc>,
    pub format_version: u32,
    pub notes: String,
}

impl CaptureManifest {
    pub fn new(
        scenario: &str,
        run_id: &str,
        session_id: Uuid,
        listen: Endpoint,
        target: Endpoint,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_id: run_id.to_string(),
            session_id,
            listen,
            target,
            created_at: Utc::now(),
            format_version: FORMAT_VERSION,
            notes: "Chunk-level TCP capture; files are ordered by events.jsonl index.".to_string(),
        }
    }
}
