//! Fixed-size envelope header, hand-packed little-endian.
//!
//! The header is the raw wire view: discriminants are stored as plain
//! integers here and promoted to typed enums by [`Envelope::from_bytes`].
//!
//! ```text
//! offset  size  field
//! 0       4     magic            b"RCM1"
//! 4       4     checksum         blake3(payload)[0..4], 0 when payload empty
//! 8       4     message_type
//! 12      4     payload_kind
//! 16      8     flags
//! 24      8     request_id
//! 32      16    session_id       uuid bytes, zeroed unless HAS_SESSION
//! 48      8     payload_length
//! ```
//!
//! [`Envelope::from_bytes`]: crate::envelope::Envelope::from_bytes

use crate::error::RemcamError;

/// Magic bytes opening every frame.
pub const MAGIC: [u8; 4] = *b"RCM1";

/// Size of the packed header in bytes.
pub const HEADER_SIZE: usize = 56;

/// Packed header bytes.
pub type HeaderBytes = [u8; HEADER_SIZE];

/// The raw envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub checksum: u32,
    pub message_type: u32,
    pub payload_kind: u32,
    pub flags: u64,
    pub request_id: u64,
    pub session_id: [u8; 16],
    pub payload_length: u64,
}

impl EnvelopeHeader {
    /// Pack the header into its wire representation.
    pub fn to_bytes(&self) -> HeaderBytes {
        let mut buf: HeaderBytes = [0; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..12].copy_from_slice(&self.message_type.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_kind.to_le_bytes());
        buf[16..24].copy_from_slice(&self.flags.to_le_bytes());
        buf[24..32].copy_from_slice(&self.request_id.to_le_bytes());
        buf[32..48].copy_from_slice(&self.session_id);
        buf[48..56].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Unpack a header, validating only the magic sequence.
    ///
    /// Discriminant validation happens one layer up, where the payload is
    /// also available for checksum verification.
    pub fn from_bytes(bytes: &HeaderBytes) -> Result<Self, RemcamError> {
        if bytes[0..4] != MAGIC {
            return Err(RemcamError::InvalidMagic);
        }
        let le_u32 = |range: std::ops::Range<usize>| {
            u32::from_le_bytes(bytes[range].try_into().expect("slice is 4 bytes"))
        };
        let le_u64 = |range: std::ops::Range<usize>| {
            u64::from_le_bytes(bytes[range].try_into().expect("slice is 8 bytes"))
        };
        let mut session_id = [0u8; 16];
        session_id.copy_from_slice(&bytes[32..48]);
        Ok(Self {
            checksum: le_u32(4..8),
            message_type: le_u32(8..12),
            payload_kind: le_u32(12..16),
            flags: le_u64(16..24),
            request_id: le_u64(24..32),
            session_id,
            payload_length: le_u64(48..56),
        })
    }
}
