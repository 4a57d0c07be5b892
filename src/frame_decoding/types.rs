use serde::Serialize;

use crate::error_handling::types::FrameError;

/// Size of the frame header: 3-byte little-endian length + 1-byte sequence id.
pub const HEADER_LEN: usize = 4;

/// Largest payload a 3-byte length field can describe.
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// One length-prefixed protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub sequence_id: u8,
    pub payload_length: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(sequence_id: u8, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge {
                length: payload.len(),
            });
        }
        Ok(Self {
            sequence_id,
            payload_length: payload.len() as u32,
            payload,
        })
    }

    /// First payload byte, the command byte for client requests.
    pub fn command(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Header followed by payload.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let len = self.payload_length.to_le_bytes();
        out.extend_from_slice(&[len[0], len[1], len[2], self.sequence_id]);
        out.extend_from_slice(&self.payload);
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

/// Encodes frames back to back.
pub fn encode_frames(frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frames.iter().map(Frame::encoded_len).sum());
    for frame in frames {
        frame.encode_into(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian_header() {
        let frame = Frame::new(3, vec![0xAA; 0x01_0203]).unwrap();
        let mut out = Vec::new();
        frame.encode_into(&mut out);
        assert_eq!(&out[..4], &[0x03, 0x02, 0x01, 0x03]);
        assert_eq!(out.len(), frame.encoded_len());
    }

    #[test]
    fn rejects_oversized_payload() {
        assert_eq!(
            Frame::new(0, vec![0; MAX_PAYLOAD_LEN + 1]),
            Err(FrameError::PayloadTooLarge {
                length: MAX_PAYLOAD_LEN + 1
            })
        );
        assert!(Frame::new(0, vec![0; MAX_PAYLOAD_LEN]).is_ok());
    }

    #[test]
    fn command_byte() {
        assert_eq!(Frame::new(0, b"\x03SELECT 1".to_vec()).unwrap().command(), Some(0x03));
        assert_eq!(Frame::new(0, Vec::new()).unwrap().command(), None);
    }
}
