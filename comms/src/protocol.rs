//! Wire-level constants for the explorer protocol.
//!
//! The protocol is length-implicit: after the handshake agrees on `ndim`,
//! every request frame is exactly `ndim * COORD_SIZE` bytes and every
//! response frame is exactly one byte.

/// Size in bytes of one point coordinate on the wire (big-endian IEEE-754).
pub const COORD_SIZE: usize = size_of::<f64>();

/// Size in bytes of the dimensionality frame sent during the handshake
/// (big-endian signed 64-bit integer).
pub const HANDSHAKE_SIZE: usize = size_of::<i64>();

/// Maximum length of the textual handshake acknowledgment.
pub const ACK_LIMIT: usize = 1024;

/// The acknowledgment the explorer sends for an accepted handshake.
pub const ACK_OK: &[u8] = b"OK\n";

/// Response byte for a point classified as valid.
pub const RESPONSE_VALID: u8 = 0x01;

/// Response byte for a point classified as invalid.
pub const RESPONSE_INVALID: u8 = 0x00;
