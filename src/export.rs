//! Packetized fixture export.
//!
//! Rebuilds both directions of a capture run, decodes them into frames and
//! writes deterministic fixture files:
//!
//! ```text
//! <out_dir>/c2s_stream.bin
//! <out_dir>/s2c_stream.bin
//! <out_dir>/c2s_packets.json   {"packets": [{"sequence_id", "payload_len", "payload_hex"}]}
//! <out_dir>/s2c_packets.json
//! <out_dir>/manifest.json
//! ```
//!
//! Both directions are decoded before anything is written, so a failed
//! export leaves no partial fixture behind.

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::data_capture::types::Direction;
use crate::error_handling::types::{ExportError, StorageError};
use crate::frame_decoding::{decode_frames, Frame};
use crate::reconstruction::StreamReconstructor;
use crate::storage::file_storage::write_json;
use crate::storage::storage_trait::ChunkStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketEntry {
    pub sequence_id: u8,
    pub payload_len: u32,
    pub payload_hex: String,
}

impl From<&Frame> for PacketEntry {
    fn from(frame: &Frame) -> Self {
        Self {
            sequence_id: frame.sequence_id,
            payload_len: frame.payload_length,
            payload_hex: hex::encode(&frame.payload),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFile {
    pub packets: Vec<PacketEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub scenario: String,
    pub run_id: String,
    pub source_run_dir: String,
    pub c2s_packets: usize,
    pub s2c_packets: usize,
}

/// Where an export reads from and writes to.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub scenario: String,
    pub run_id: String,
    pub source_run_dir: PathBuf,
    pub out_dir: PathBuf,
}

pub fn export_run(
    store: &dyn ChunkStore,
    request: &ExportRequest,
) -> Result<ExportManifest, ExportError> {
    let streams = StreamReconstructor::new(store).build_streams()?;

    let decode = |direction: Direction| {
        decode_frames(streams.get(direction))
            .map_err(|source| ExportError::Framing { direction, source })
    };
    let c2s_frames = decode(Direction::ClientToServer)?;
    let s2c_frames = decode(Direction::ServerToClient)?;

    let out_dir = &request.out_dir;
    fs::create_dir_all(out_dir).map_err(|e| {
        error!("Failed to create export dir {}: {}", out_dir.display(), e);
        StorageError::WriteFailed {
            path: out_dir.clone(),
            source: e,
        }
    })?;

    for direction in Direction::ALL {
        write_bin(
            &out_dir.join(format!("{}_stream.bin", direction.tag())),
            streams.get(direction),
        )?;
    }
    write_packets(&out_dir.join("c2s_packets.json"), &c2s_frames)?;
    write_packets(&out_dir.join("s2c_packets.json"), &s2c_frames)?;

    let manifest = ExportManifest {
        scenario: request.scenario.clone(),
        run_id: request.run_id.clone(),
        source_run_dir: request.source_run_dir.display().to_string(),
        c2s_packets: c2s_frames.len(),
        s2c_packets: s2c_frames.len(),
    };
    write_json(&out_dir.join("manifest.json"), &manifest)?;

    info!("wrote {}", out_dir.display());
    info!("c2s packets: {}", manifest.c2s_packets);
    info!("s2c packets: {}", manifest.s2c_packets);
    Ok(manifest)
}

fn write_bin(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    fs::write(path, data).map_err(|e| {
        error!("Write failed {}: {}", path.display(), e);
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn write_packets(path: &Path, frames: &[Frame]) -> Result<(), StorageError> {
    let file = PacketFile {
        packets: frames.iter().map(PacketEntry::from).collect(),
    };
    write_json(path, &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::recorder::SessionRecorder;
    use crate::frame_decoding::encode_frames;
    use crate::storage::file_storage::FileChunkStore;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn request(capture: &Path, out: &Path) -> ExportRequest {
        ExportRequest {
            scenario: "select".to_string(),
            run_id: "run-1".to_string(),
            source_run_dir: capture.to_path_buf(),
            out_dir: out.join("select").join("run-1"),
        }
    }

    #[test]
    fn exports_streams_and_packets() {
        let capture = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let store = Arc::new(FileChunkStore::open(capture.path()));

        let greeting = encode_frames(&[Frame::new(0, b"\x0a5.5.5-MariaDB".to_vec()).unwrap()]);
        let query = b"\x07\x00\x00\x00\x03SELECT";
        {
            let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());
            recorder
                .record_chunk(Direction::ServerToClient, &greeting)
                .unwrap();
            // split mid-header to show chunk boundaries do not matter
            recorder
                .record_chunk(Direction::ClientToServer, &query[..2])
                .unwrap();
            recorder
                .record_chunk(Direction::ClientToServer, &query[2..])
                .unwrap();
        }

        let req = request(capture.path(), out.path());
        let manifest = export_run(&*store, &req).unwrap();
        assert_eq!(manifest.c2s_packets, 1);
        assert_eq!(manifest.s2c_packets, 1);

        assert_eq!(fs::read(req.out_dir.join("c2s_stream.bin")).unwrap(), query);
        assert_eq!(fs::read(req.out_dir.join("s2c_stream.bin")).unwrap(), greeting);

        let packets: PacketFile =
            serde_json::from_str(&fs::read_to_string(req.out_dir.join("c2s_packets.json")).unwrap())
                .unwrap();
        assert_eq!(
            packets.packets,
            vec![PacketEntry {
                sequence_id: 0,
                payload_len: 7,
                payload_hex: "0353454c454354".to_string(),
            }]
        );

        let written: ExportManifest =
            serde_json::from_str(&fs::read_to_string(req.out_dir.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(written, manifest);
    }

    #[test]
    fn framing_failure_writes_nothing() {
        let capture = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let store = Arc::new(FileChunkStore::open(capture.path()));
        {
            let mut recorder = SessionRecorder::new(Uuid::new_v4(), store.clone());
            recorder
                .record_chunk(Direction::ClientToServer, &[0x16, 0x03, 0x01, 0x00, 0xa5, 0x01])
                .unwrap();
        }

        let req = request(capture.path(), out.path());
        let err = export_run(&*store, &req).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Framing {
                direction: Direction::ClientToServer,
                source: crate::error_handling::types::FrameError::LikelyNonPlaintextStream { .. }
            }
        ));
        assert!(!req.out_dir.exists());
    }
}
