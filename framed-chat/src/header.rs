//! Fixed-width length prefix carried in front of every frame.
//!
//! The width is fixed at build time by [`Length`]; both peers must agree on it
//! since nothing on the wire announces it.

/// Numeric type of the length prefix.
pub type Length = u64;

/// Number of bytes in an encoded header.
pub const HEADER_LEN: usize = std::mem::size_of::<Length>();

/// Reserved length. A header carrying it ends the stream gracefully and is
/// never followed by a body.
pub const SENTINEL: Length = Length::MAX;

const BITS_IN_BYTE: usize = 8;

/// Encodes `length` most-significant byte first.
pub fn encode(length: Length) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    for (i, byte) in header.iter_mut().enumerate() {
        let shift = BITS_IN_BYTE * (HEADER_LEN - 1 - i);
        *byte = ((length >> shift) & 0xFF) as u8;
    }
    header
}

/// Reassembles a length from its big-endian encoding.
///
/// No validation happens here. Callers compare the result against
/// [`SENTINEL`] before treating it as a body size.
pub fn decode(header: &[u8; HEADER_LEN]) -> Length {
    header
        .iter()
        .fold(0, |length: Length, &byte| {
            (length << BITS_IN_BYTE) | Length::from(byte)
        })
}

/// Builds a complete frame: encoded header followed by `payload`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&encode(payload.len() as Length));
    frame.extend_from_slice(payload);
    frame
}
