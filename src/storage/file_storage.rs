use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, error, info};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::ChunkStore;
use crate::storage::types::{CaptureManifest, ChunkRecord, SessionSummary};

pub const EVENTS_FILE: &str = "events.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Filesystem-backed chunk store rooted at one run directory.
///
/// Layout:
/// ```text
/// <run_dir>/manifest.json
/// <run_dir>/events.jsonl        one ChunkRecord per line
/// <run_dir>/0000_c2s.bin        one blob per chunk
/// <run_dir>/summary.json
/// ```
#[derive(Debug, Clone)]
pub struct FileChunkStore {
    run_dir: PathBuf,
}

impl FileChunkStore {
    /// Opens an existing run directory for reading.
    pub fn open<P: AsRef<Path>>(run_dir: P) -> Self {
        Self {
            run_dir: run_dir.as_ref().to_path_buf(),
        }
    }

    /// Creates `<output_root>/<scenario>/<run_id>/` and returns the store and its run id.
    ///
    /// The run id is `YYYYmmdd-HHMMSS-<pid>`; an existing directory with the same
    /// id is an error rather than being reused.
    pub fn create_run<P: AsRef<Path>>(
        output_root: P,
        scenario: &str,
    ) -> Result<(Self, String), StorageError> {
        let run_id = format!(
            "{}-{}",
            Local::now().format("%Y%m%d-%H%M%S"),
            std::process::id()
        );
        let scenario_dir = output_root.as_ref().join(scenario);
        fs::create_dir_all(&scenario_dir).map_err(|e| {
            error!("Failed to create scenario dir {}: {}", scenario_dir.display(), e);
            StorageError::WriteFailed {
                path: scenario_dir.clone(),
                source: e,
            }
        })?;
        let run_dir = scenario_dir.join(&run_id);
        fs::create_dir(&run_dir).map_err(|e| {
            error!("Failed to create run dir {}: {}", run_dir.display(), e);
            StorageError::WriteFailed {
                path: run_dir.clone(),
                source: e,
            }
        })?;
        info!("FileChunkStore initialized at {}", run_dir.display());
        Ok((Self { run_dir }, run_id))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn events_path(&self) -> PathBuf {
        self.run_dir.join(EVENTS_FILE)
    }

    pub fn write_manifest(&self, manifest: &CaptureManifest) -> Result<(), StorageError> {
        let path = self.run_dir.join(MANIFEST_FILE);
        write_json(&path, manifest)?;
        info!("Saved manifest for run {} to {}", manifest.run_id, path.display());
        Ok(())
    }

    pub fn read_manifest(&self) -> Result<Option<CaptureManifest>, StorageError> {
        read_json(&self.run_dir.join(MANIFEST_FILE))
    }
}

impl ChunkStore for FileChunkStore {
    fn append_chunk(&self, record: &ChunkRecord, payload: &[u8]) -> Result<(), StorageError> {
        let blob_path = self.run_dir.join(&record.blob);
        fs::write(&blob_path, payload).map_err(|e| {
            error!("Write failed {}: {}", blob_path.display(), e);
            StorageError::WriteFailed {
                path: blob_path.clone(),
                source: e,
            }
        })?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let events_path = self.events_path();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)
            .map_err(|e| {
                error!("Open append failed {}: {}", events_path.display(), e);
                StorageError::WriteFailed {
                    path: events_path.clone(),
                    source: e,
                }
            })?;
        f.write_all(line.as_bytes()).map_err(|e| {
            error!("Write failed {}: {}", events_path.display(), e);
            StorageError::WriteFailed {
                path: events_path.clone(),
                source: e,
            }
        })?;
        debug!(
            "Appended chunk {} ({} byte(s), {}) to {}",
            record.index,
            payload.len(),
            record.direction,
            self.run_dir.display()
        );
        Ok(())
    }

    fn write_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        let path = self.run_dir.join(SUMMARY_FILE);
        write_json(&path, summary)?;
        info!("Saved summary for session {} to {}", summary.session_id, path.display());
        Ok(())
    }

    fn read_summary(&self) -> Result<Option<SessionSummary>, StorageError> {
        read_json(&self.run_dir.join(SUMMARY_FILE))
    }

    fn read_event_lines(&self) -> Result<Vec<String>, StorageError> {
        let path = self.events_path();
        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Read failed {}: {}", path.display(), e);
            StorageError::ReadFailed {
                path: path.clone(),
                source: e,
            }
        })?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        debug!("Read {} metadata line(s) from {}", lines.len(), path.display());
        Ok(lines)
    }

    fn read_blob(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.run_dir.join(name);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Read failed {}: {}", path.display(), e);
                Err(StorageError::ReadFailed { path, source: e })
            }
        }
    }
}

/// Pretty-prints `value` to `path` with a trailing newline.
pub(crate) fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body).map_err(|e| {
        error!("Write failed {}: {}", path.display(), e);
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!("Read failed {}: {}", path.display(), e);
            Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::Endpoint;
    use crate::data_capture::types::{CloseReason, Direction};
    use crate::storage::types::SessionStatus;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(index: u64, direction: Direction, len: usize) -> ChunkRecord {
        ChunkRecord {
            index,
            direction,
            byte_count: len as u64,
            timestamp_ns: index * 1_000,
            blob: ChunkRecord::blob_name(index, direction),
        }
    }

    #[test]
    fn test_create_run_layout() {
        let dir = TempDir::new().unwrap();
        let (store, run_id) = FileChunkStore::create_run(dir.path(), "handshake").unwrap();
        assert_eq!(store.run_dir(), dir.path().join("handshake").join(&run_id));
        assert!(store.run_dir().is_dir());
    }

    #[test]
    fn test_append_chunk_writes_blob_and_metadata() {
        let dir = TempDir::new().unwrap();
        let store = FileChunkStore::open(dir.path());
        store
            .append_chunk(&record(0, Direction::ClientToServer, 3), b"abc")
            .unwrap();
        store
            .append_chunk(&record(1, Direction::ServerToClient, 2), b"xy")
            .unwrap();

        assert_eq!(fs::read(dir.path().join("0000_c2s.bin")).unwrap(), b"abc");
        assert_eq!(fs::read(dir.path().join("0001_s2c.bin")).unwrap(), b"xy");

        let lines = store.read_event_lines().unwrap();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["index"], 0);
        assert_eq!(first["direction"], "c2s");
        assert_eq!(first["bytes"], 3);
        assert_eq!(first["ts_ns"], 0);
        assert_eq!(first["file"], "0000_c2s.bin");
    }

    #[test]
    fn test_read_blob_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileChunkStore::open(dir.path());
        assert!(store.read_blob("0042_c2s.bin").unwrap().is_none());
    }

    #[test]
    fn test_missing_events_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let store = FileChunkStore::open(dir.path());
        assert!(matches!(
            store.read_event_lines(),
            Err(StorageError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_summary_and_manifest_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileChunkStore::open(dir.path());
        assert!(store.read_summary().unwrap().is_none());

        let now = Utc::now();
        let summary = SessionSummary {
            session_id: Uuid::new_v4(),
            start: now,
            end: now,
            start_ns: 10,
            end_ns: 20,
            duration_ms: 0,
            chunks: 2,
            bytes_c2s: 3,
            bytes_s2c: 2,
            status: SessionStatus::Interrupted,
            close_reason: CloseReason::Interrupted,
            error: None,
        };
        store.write_summary(&summary).unwrap();
        assert_eq!(store.read_summary().unwrap(), Some(summary));

        let raw = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(raw.contains("\"status\": \"interrupted\""));
        assert!(!raw.contains("\"error\""));

        let manifest = CaptureManifest::new(
            "login",
            "20260101-000000-1",
            Uuid::new_v4(),
            Endpoint::new("127.0.0.1", 3307),
            Endpoint::new("127.0.0.1", 3306),
        );
        store.write_manifest(&manifest).unwrap();
        assert_eq!(store.read_manifest().unwrap(), Some(manifest));
    }
}
