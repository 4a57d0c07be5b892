//! Stream reconstruction
//!
//! Turns the chunk log of one capture session into the canonical byte stream
//! of each direction: records are sorted by `index` (on-disk order is never
//! trusted), filtered by direction and their blobs concatenated. No bytes are
//! transformed and nothing protocol-specific happens here.

use std::path::{Component, Path};

use log::{debug, info};

use crate::data_capture::types::Direction;
use crate::error_handling::types::ReconstructionError;
use crate::storage::storage_trait::ChunkStore;
use crate::storage::types::ChunkRecord;

/// Canonical streams of both directions of one capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalStreams {
    pub client_to_server: Vec<u8>,
    pub server_to_client: Vec<u8>,
}

impl CanonicalStreams {
    pub fn get(&self, direction: Direction) -> &[u8] {
        match direction {
            Direction::ClientToServer => &self.client_to_server,
            Direction::ServerToClient => &self.server_to_client,
        }
    }
}

pub struct StreamReconstructor<'a> {
    store: &'a dyn ChunkStore,
}

impl<'a> StreamReconstructor<'a> {
    pub fn new(store: &'a dyn ChunkStore) -> Self {
        Self { store }
    }

    /// Loads and validates every metadata record, sorted by index.
    pub fn load_records(&self) -> Result<Vec<ChunkRecord>, ReconstructionError> {
        let lines = self.store.read_event_lines()?;
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(parse_record(line_no, line)?);
        }
        records.sort_by_key(|r| r.index);

        if let Some(pair) = records.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(ReconstructionError::MalformedMetadata {
                line: lines
                    .iter()
                    .rposition(|l| parse_index(l) == Some(pair[1].index))
                    .map_or(0, |p| p + 1),
                reason: format!("duplicate chunk index {}", pair[1].index),
            });
        }
        debug!("Loaded {} chunk record(s)", records.len());
        Ok(records)
    }

    /// Builds the canonical stream for one direction.
    pub fn build_stream(&self, direction: Direction) -> Result<Vec<u8>, ReconstructionError> {
        let records = self.load_records()?;
        self.concat(&records, direction)
    }

    /// Builds both canonical streams from a single pass over the metadata.
    pub fn build_streams(&self) -> Result<CanonicalStreams, ReconstructionError> {
        let records = self.load_records()?;
        let streams = CanonicalStreams {
            client_to_server: self.concat(&records, Direction::ClientToServer)?,
            server_to_client: self.concat(&records, Direction::ServerToClient)?,
        };
        info!(
            "Reconstructed streams: c2s={} byte(s), s2c={} byte(s) from {} chunk(s)",
            streams.client_to_server.len(),
            streams.server_to_client.len(),
            records.len()
        );
        Ok(streams)
    }

    fn concat(
        &self,
        records: &[ChunkRecord],
        direction: Direction,
    ) -> Result<Vec<u8>, ReconstructionError> {
        let mut stream = Vec::new();
        for record in records.iter().filter(|r| r.direction == direction) {
            let data = self.store.read_blob(&record.blob)?.ok_or_else(|| {
                ReconstructionError::MissingChunkData {
                    index: record.index,
                    file: record.blob.clone(),
                }
            })?;
            if data.len() as u64 != record.byte_count {
                return Err(ReconstructionError::ChunkLengthMismatch {
                    index: record.index,
                    expected: record.byte_count,
                    actual: data.len() as u64,
                });
            }
            stream.extend_from_slice(&data);
        }
        Ok(stream)
    }
}

fn parse_record(line_no: usize, line: &str) -> Result<ChunkRecord, ReconstructionError> {
    let malformed = |reason: String| ReconstructionError::MalformedMetadata {
        line: line_no,
        reason,
    };
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(malformed("record is not a JSON object".to_string()));
    }
    let record: ChunkRecord = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

    // blob references stay inside the run directory
    let mut components = Path::new(&record.blob).components();
    let plain_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain_name {
        return Err(malformed(format!("invalid blob reference {:?}", record.blob)));
    }
    Ok(record)
}

fn parse_index(line: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()?
        .get("index")?
        .as_u64()
}
