//! Storage subsystem
//!
//! This module provides the chunk store: the persisted record of one capture
//! session, written by the relay and read back by the reconstructor.
//!
//! Components:
//! - `storage_trait`: the ChunkStore trait defining the read/write contract.
//! - `types`: chunk records, session summary and manifest.
//! - `file_storage`: run-directory implementation (JSON lines + one blob per chunk).

pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use file_storage::FileChunkStore;
pub use storage_trait::ChunkStore;
