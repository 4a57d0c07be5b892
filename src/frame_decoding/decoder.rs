use log::debug;

use super::heuristic::is_likely_misframed;
use super::types::{Frame, HEADER_LEN};
use crate::error_handling::types::FrameError;

/// Decodes a canonical stream into frames.
///
/// All or nothing: on any boundary violation the frames decoded so far are
/// discarded and the error carries the failing offset. A payload overrun is
/// reported as [`FrameError::LikelyNonPlaintextStream`] when the bytes around
/// the failing header look like a TLS record, and as
/// [`FrameError::TruncatedPayload`] otherwise.
pub fn decode_frames(buf: &[u8]) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let remaining = buf.len() - offset;
        if remaining < HEADER_LEN {
            return Err(FrameError::TruncatedHeader { offset, remaining });
        }

        let header = &buf[offset..offset + HEADER_LEN];
        let payload_length =
            u32::from(header[0]) | (u32::from(header[1]) << 8) | (u32::from(header[2]) << 16);
        let sequence_id = header[3];
        offset += HEADER_LEN;

        let needed = payload_length as usize;
        let have = buf.len() - offset;
        if needed > have {
            if is_likely_misframed(buf, offset) {
                return Err(FrameError::LikelyNonPlaintextStream {
                    offset,
                    declared_length: needed,
                });
            }
            return Err(FrameError::TruncatedPayload {
                offset,
                needed,
                have,
            });
        }

        frames.push(Frame {
            sequence_id,
            payload_length,
            payload: buf[offset..offset + needed].to_vec(),
        });
        offset += needed;
    }

    debug!("Decoded {} frame(s) from {} byte(s)", frames.len(), buf.len());
    Ok(frames)
}
