//! Chunk store trait
//!
//! This module defines the `ChunkStore` trait, the persistence contract between the
//! capture relay (writer) and the stream reconstructor (reader).
//!
//! Implementors of this trait are responsible for:
//! - Persisting each chunk's payload blob and its metadata record, in that order
//! - Persisting the single session summary
//! - Handing back raw metadata lines and blobs for offline reconstruction
//!
//! Metadata is returned as raw lines on purpose: validating records is the
//! reconstructor's job, and a store must not hide malformed entries.

use crate::error_handling::types::StorageError;
use crate::storage::types::{ChunkRecord, SessionSummary};

pub trait ChunkStore: Send + Sync {
    /// Persists `payload` under `record.blob`, then appends `record` to the metadata log.
    ///
    /// Both writes must have completed when this returns `Ok`.
    fn append_chunk(&self, record: &ChunkRecord, payload: &[u8]) -> Result<(), StorageError>;

    /// Writes the session summary.
    fn write_summary(&self, summary: &SessionSummary) -> Result<(), StorageError>;

    /// Returns the summary, if one was written.
    fn read_summary(&self) -> Result<Option<SessionSummary>, StorageError>;

    /// Returns the metadata log, one entry per line, in on-disk order.
    fn read_event_lines(&self) -> Result<Vec<String>, StorageError>;

    /// Returns the blob named `name`, or `None` if it does not exist.
    fn read_blob(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;
}
