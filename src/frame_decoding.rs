//! Frame decoding
//!
//! Parses a canonical stream into MySQL/MariaDB-style frames: a 3-byte
//! little-endian payload length and a 1-byte sequence id, followed by the
//! payload. Decoding is offline and side-effect free.

pub mod decoder;
pub mod heuristic;
pub mod types;

pub use decoder::decode_frames;
pub use heuristic::{is_likely_misframed, looks_like_tls_record};
pub use types::{encode_frames, Frame, HEADER_LEN, MAX_PAYLOAD_LEN};
