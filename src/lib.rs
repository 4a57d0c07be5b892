//! Single-session TCP capture and MySQL/MariaDB frame extraction.
//!
//! Pipeline: [`data_capture::CaptureRelay`] records every forwarded chunk into
//! a [`storage::ChunkStore`]; [`reconstruction::StreamReconstructor`] rebuilds
//! each direction; [`frame_decoding::decode_frames`] splits it into frames;
//! [`export::export_run`] writes packetized fixtures.

pub mod configuration;
pub mod data_capture;
pub mod error_handling;
pub mod export;
pub mod frame_decoding;
pub mod reconstruction;
pub mod storage;

pub use data_capture::types::Direction;
pub use error_handling::types::{
    CaptureError, ConfigError, ExportError, FrameError, ReconstructionError, StorageError,
};
