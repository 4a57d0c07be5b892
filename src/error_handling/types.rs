use std::fmt;
use std::path::PathBuf;

use crate::data_capture::types::Direction;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    WriteFailed { path: PathBuf, source: std::io::Error },
    ReadFailed { path: PathBuf, source: std::io::Error },
    Serialization(serde_json::Error),
    AlreadyFinalized,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::WriteFailed { path, source } => {
                write!(f, "Storage write failed for {}: {}", path.display(), source)
            }
            StorageError::ReadFailed { path, source } => {
                write!(f, "Storage read failed for {}: {}", path.display(), source)
            }
            StorageError::Serialization(e) => write!(f, "Storage serialization error: {}", e),
            StorageError::AlreadyFinalized => write!(f, "Capture session already finalized"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::WriteFailed { source, .. } | StorageError::ReadFailed { source, .. } => {
                Some(source)
            }
            StorageError::Serialization(e) => Some(e),
            StorageError::AlreadyFinalized => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    Bind(std::io::Error),
    Accept(std::io::Error),
    Connect(std::io::Error),
    ConnectTimeout { target: String },
    TcpStreamError { direction: Direction, source: std::io::Error },
    StorageError(StorageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Bind(e) => write!(f, "Unable to bind listener: {}", e),
            CaptureError::Accept(e) => write!(f, "Unable to accept client connection: {}", e),
            CaptureError::Connect(e) => write!(f, "Unable to connect to target: {}", e),
            CaptureError::ConnectTimeout { target } => {
                write!(f, "Timed out connecting to target {}", target)
            }
            CaptureError::TcpStreamError { direction, source } => {
                write!(f, "TCP stream error while relaying {}: {}", direction, source)
            }
            CaptureError::StorageError(e) => write!(f, "Capture storage error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::StorageError(err)
    }
}

#[derive(Debug)]
pub enum ReconstructionError {
    /// A metadata record points at a blob that is not present.
    MissingChunkData { index: u64, file: String },
    /// `line` is 1-based within the metadata log.
    MalformedMetadata { line: usize, reason: String },
    ChunkLengthMismatch { index: u64, expected: u64, actual: u64 },
    Storage(StorageError),
}

impl fmt::Display for ReconstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructionError::MissingChunkData { index, file } => {
                write!(f, "Missing chunk data for index {} ({})", index, file)
            }
            ReconstructionError::MalformedMetadata { line, reason } => {
                write!(f, "Malformed metadata at line {}: {}", line, reason)
            }
            ReconstructionError::ChunkLengthMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "Chunk {} length mismatch: metadata says {} byte(s), blob has {}",
                index, expected, actual
            ),
            ReconstructionError::Storage(e) => write!(f, "Reconstruction storage error: {}", e),
        }
    }
}

impl std::error::Error for ReconstructionError {}

impl From<StorageError> for ReconstructionError {
    fn from(err: StorageError) -> Self {
        ReconstructionError::Storage(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer than 4 bytes remain at `offset`.
    TruncatedHeader { offset: usize, remaining: usize },
    /// `offset` is where the payload would start.
    TruncatedPayload {
        offset: usize,
        needed: usize,
        have: usize,
    },
    /// The overrun looks like a TLS record header was read as a frame header.
    LikelyNonPlaintextStream { offset: usize, declared_length: usize },
    PayloadTooLarge { length: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TruncatedHeader { offset, remaining } => write!(
                f,
                "truncated header at offset {}: {} byte(s) remaining",
                offset, remaining
            ),
            FrameError::TruncatedPayload {
                offset,
                needed,
                have,
            } => write!(
                f,
                "truncated payload at offset {}: need {}, have {}",
                offset, needed, have
            ),
            FrameError::LikelyNonPlaintextStream {
                offset,
                declared_length,
            } => write!(
                f,
                "non-plain stream detected at offset {} (declared length {} looks like a TLS record); capture with TLS disabled",
                offset, declared_length
            ),
            FrameError::PayloadTooLarge { length } => {
                write!(f, "payload of {} byte(s) exceeds the 3-byte length field", length)
            }
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Debug)]
pub enum ExportError {
    Reconstruction(ReconstructionError),
    Framing { direction: Direction, source: FrameError },
    Storage(StorageError),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Reconstruction(e) => write!(f, "Export failed: {}", e),
            ExportError::Framing { direction, source } => {
                write!(f, "Export failed in {}: {}", direction, source)
            }
            ExportError::Storage(e) => write!(f, "Export storage error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<ReconstructionError> for ExportError {
    fn from(err: ReconstructionError) -> Self {
        ExportError::Reconstruction(err)
    }
}

impl From<StorageError> for ExportError {
    fn from(err: StorageError) -> Self {
        ExportError::Storage(err)
    }
}
