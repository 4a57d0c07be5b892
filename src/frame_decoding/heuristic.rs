//! Misframing heuristic.
//!
//! A capture taken over an encrypted channel starts with TLS records
//! (`content_type, 0x03, minor, len_hi, len_lo`). Read as a frame header, the
//! first three bytes give a length in the hundreds of thousands, which
//! overruns the buffer. These helpers tell that case apart from a plain
//! truncated stream.
//!
//! This is a pattern match, not a parser. It misses record layouts outside
//! the content types and versions below, and a plaintext payload that happens
//! to start with e.g. `16 03 01` is classified as TLS.

/// change_cipher_spec, alert, handshake, application_data
const TLS_CONTENT_TYPES: [u8; 4] = [20, 21, 22, 23];
const TLS_MAJOR_VERSION: u8 = 3;
/// SSL 3.0 through TLS 1.3 wire versions.
const TLS_MAX_MINOR_VERSION: u8 = 4;
/// content type + version + 2-byte record length
pub const TLS_RECORD_HEADER_LEN: usize = 5;

/// Whether `buf[pos..pos + 5]` looks like a TLS record header.
///
/// Requires all five header bytes to be present.
pub fn looks_like_tls_record(buf: &[u8], pos: usize) -> bool {
    let Some(header) = buf.get(pos..pos.saturating_add(TLS_RECORD_HEADER_LEN)) else {
        return false;
    };
    TLS_CONTENT_TYPES.contains(&header[0])
        && header[1] == TLS_MAJOR_VERSION
        && header[2] <= TLS_MAX_MINOR_VERSION
}

/// Checks `offset` and `offset - 4`; the latter covers a TLS record whose first
/// four bytes were already consumed as a frame header.
pub fn is_likely_misframed(buf: &[u8], offset: usize) -> bool {
    looks_like_tls_record(buf, offset)
        || offset
            .checked_sub(super::types::HEADER_LEN)
            .is_some_and(|pos| looks_like_tls_record(buf, pos))
}
