//! Chunk recording for a single capture session.
//!
//! `SessionRecorder` owns the ordering state of one session: the next global
//! chunk index, per-direction byte totals and the monotonic clock the chunk
//! timestamps are measured on. Every forwarded chunk goes through
//! [`SessionRecorder::record_chunk`], which persists the blob and its metadata
//! through the injected [`ChunkStore`] before returning.
//!
//! The session summary is written exactly once. Callers normally write it with
//! [`SessionRecorder::finalize`]; if the recorder is dropped first (the relay
//! future was cancelled, or a panic unwound through it), `Drop` writes an
//! `interrupted` summary instead.
//!
//! Logging
//! - DEBUG/INFO for lifecycle milestones
//! - TRACE for short (64-byte) previews of captured chunks

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::ChunkStore;
use crate::storage::types::{ChunkRecord, SessionStatus, SessionSummary};

use super::types::{CloseReason, Direction};

const PREVIEW_LEN: usize = 64;

pub struct SessionRecorder {
    /// Unique session identifier (used to correlate logs and persisted data).
    session_id: Uuid,
    store: Arc<dyn ChunkStore>,
    /// Index the next chunk will be persisted under.
    next_index: u64,
    bytes_c2s: u64,
    bytes_s2c: u64,
    /// Monotonic origin for chunk timestamps and the session duration.
    started: Instant,
    started_at: DateTime<Utc>,
    finalized: bool,
}

impl SessionRecorder {
    pub fn new(session_id: Uuid, store: Arc<dyn ChunkStore>) -> Self {
        debug!("[{}] SessionRecorder created", session_id);
        Self {
            session_id,
            store,
            next_index: 0,
            bytes_c2s: 0,
            bytes_s2c: 0,
            started: Instant::now(),
            started_at: Utc::now(),
            finalized: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of chunks persisted so far.
    pub fn chunk_count(&self) -> u64 {
        self.next_index
    }

    pub fn bytes(&self, direction: Direction) -> u64 {
        match direction {
            Direction::ClientToServer => self.bytes_c2s,
            Direction::ServerToClient => self.bytes_s2c,
        }
    }

    /// Persists one forwarded chunk under the next index.
    ///
    /// The index and totals only advance once the store has accepted both the
    /// blob and the metadata record, so persisted state is always a strict
    /// prefix of what was forwarded.
    pub fn record_chunk(
        &mut self,
        direction: Direction,
        payload: &[u8],
    ) -> Result<ChunkRecord, StorageError> {
        if self.finalized {
            return Err(StorageError::AlreadyFinalized);
        }
        let index = self.next_index;
        let record = ChunkRecord {
            index,
            direction,
            byte_count: payload.len() as u64,
            timestamp_ns: self.started.elapsed().as_nanos() as u64,
            blob: ChunkRecord::blob_name(index, direction),
        };
        self.store.append_chunk(&record, payload)?;

        self.next_index += 1;
        match direction {
            Direction::ClientToServer => self.bytes_c2s += record.byte_count,
            Direction::ServerToClient => self.bytes_s2c += record.byte_count,
        }

        let preview = &payload[..payload.len().min(PREVIEW_LEN)];
        trace!(
            "[{}] captured {} #{} {} bytes: {}{}",
            self.session_id,
            direction,
            index,
            payload.len(),
            String::from_utf8_lossy(preview),
            if payload.len() > PREVIEW_LEN { " ..." } else { "" }
        );
        Ok(record)
    }

    /// Builds and persists the session summary. Fails if it was already written.
    pub fn finalize(
        &mut self,
        reason: CloseReason,
        error: Option<String>,
    ) -> Result<SessionSummary, StorageError> {
        if self.finalized {
            return Err(StorageError::AlreadyFinalized);
        }
        // A failed write is not retried from Drop.
        self.finalized = true;

        let elapsed = self.started.elapsed();
        let end = Utc::now();
        let summary = SessionSummary {
            session_id: self.session_id,
            start: self.started_at,
            end,
            start_ns: self.started_at.timestamp_nanos_opt().unwrap_or_default(),
            end_ns: end.timestamp_nanos_opt().unwrap_or_default(),
            duration_ms: elapsed.as_millis() as u64,
            chunks: self.next_index,
            bytes_c2s: self.bytes_c2s,
            bytes_s2c: self.bytes_s2c,
            status: SessionStatus::from(reason),
            close_reason: reason,
            error,
        };

        info!(
            "[{}] Finalized capture: status={:?}, chunks={}, c2s={}, s2c={}, duration={:?}",
            self.session_id,
            summary.status,
            summary.chunks,
            summary.bytes_c2s,
            summary.bytes_s2c,
            elapsed
        );
        self.store.write_summary(&summary)?;
        Ok(summary)
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let reason = if std::thread::panicking() {
            "capture aborted by panic"
        } else {
            "capture dropped before completion"
        };
        if let Err(e) = self.finalize(CloseReason::Interrupted, Some(reason.to_string())) {
            error!("[{}] Unable to write session summary: {}", self.session_id, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store shared by the capture and reconstruction tests.
    #[derive(Default)]
    pub(crate) struct MemStore {
        pub(crate) lines: Mutex<Vec<String>>,
        pub(crate) blobs: Mutex<HashMap<String, Vec<u8>>>,
        pub(crate) summaries: Mutex<Vec<SessionSummary>>,
        pub(crate) fail_writes: bool,
    }

    impl ChunkStore for MemStore {
        fn append_chunk(&self, record: &ChunkRecord, payload: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::WriteFailed {
                    path: record.blob.clone().into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(record.blob.clone(), payload.to_vec());
            self.lines
                .lock()
                .unwrap()
                .push(serde_json::to_string(record)?);
            Ok(())
        }

        fn write_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
            self.summaries.lock().unwrap().push(summary.clone());
            Ok(())
        }

        fn read_summary(&self) -> Result<Option<SessionSummary>, StorageError> {
            Ok(self.summaries.lock().unwrap().last().cloned())
        }

        fn read_event_lines(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.lines.lock().unwrap().clone())
        }

        fn read_blob(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(self.blobs.lock().unwrap().get(name).cloned())
        }
    }

    #[test]
    fn test_indices_interleave_across_directions() {
        let store = Arc::new(MemStore::default());
        let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());

        let a = recorder.record_chunk(Direction::ClientToServer, b"ab").unwrap();
        let b = recorder.record_chunk(Direction::ServerToClient, b"xyz").unwrap();
        let c = recorder.record_chunk(Direction::ClientToServer, b"c").unwrap();

        assert_eq!((a.index, b.index, c.index), (0, 1, 2));
        assert_eq!(b.blob, "0001_s2c.bin");
        assert!(a.timestamp_ns <= b.timestamp_ns && b.timestamp_ns <= c.timestamp_ns);
        assert_eq!(recorder.bytes(Direction::ClientToServer), 3);
        assert_eq!(recorder.bytes(Direction::ServerToClient), 3);
        assert_eq!(store.lines.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_persist_does_not_advance_index() {
        let store = Arc::new(MemStore {
            fail_writes: true,
            ..Default::default()
        });
        let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());
        assert!(recorder.record_chunk(Direction::ClientToServer, b"x").is_err());
        assert_eq!(recorder.chunk_count(), 0);
        assert_eq!(recorder.bytes(Direction::ClientToServer), 0);
    }

    #[test]
    fn test_finalize_writes_summary_once() {
        let store = Arc::new(MemStore::default());
        let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());
        recorder.record_chunk(Direction::ServerToClient, b"hello").unwrap();

        let summary = recorder.finalize(CloseReason::ServerClosed, None).unwrap();
        assert_eq!(summary.status, SessionStatus::Ok);
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.bytes_s2c, 5);
        assert!(summary.end_ns >= summary.start_ns);

        assert!(matches!(
            recorder.finalize(CloseReason::ClientClosed, None),
            Err(StorageError::AlreadyFinalized)
        ));
        assert!(matches!(
            recorder.record_chunk(Direction::ClientToServer, b"late"),
            Err(StorageError::AlreadyFinalized)
        ));
        drop(recorder);
        assert_eq!(store.summaries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_without_finalize_writes_interrupted_summary() {
        let store = Arc::new(MemStore::default());
        {
            let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());
            recorder.record_chunk(Direction::ClientToServer, b"q").unwrap();
        }
        let summaries = store.summaries.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, SessionStatus::Interrupted);
        assert_eq!(summaries[0].chunks, 1);
        assert!(summaries[0].error.is_some());
    }
}
