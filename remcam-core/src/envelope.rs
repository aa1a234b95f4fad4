//! The validated wire envelope.
//!
//! An [`Envelope`] is the decoded, fully-checked form of one frame: typed
//! discriminants, an optional session token, a correlation id, and the raw
//! payload body. Construction and decoding enforce the size limit and the
//! payload checksum, so `to_bytes` never fails.

use uuid::Uuid;

use crate::error::RemcamError;
use crate::flags::EnvelopeFlags;
use crate::header::{EnvelopeHeader, HEADER_SIZE};
use crate::message::{MessageType, PayloadKind};

/// Maximum payload body size: 256 KiB.
pub const MAX_PAYLOAD_SIZE: usize = 256 * 1024;

/// Maximum total frame size accepted by the codec.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// One protocol message, decoded and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    message_type: MessageType,
    payload_kind: PayloadKind,
    request_id: u64,
    session_id: Option<Uuid>,
    payload: Vec<u8>,
}

impl Envelope {
    /// Build a request envelope.
    ///
    /// Session-control requests usually carry an empty payload; `Command`
    /// requests carry a bincode-encoded `RequestPayload`.
    pub fn request(
        message_type: MessageType,
        request_id: u64,
        session_id: Option<Uuid>,
        payload: Vec<u8>,
    ) -> Result<Self, RemcamError> {
        Self::new(message_type, PayloadKind::Request, request_id, session_id, payload)
    }

    /// Build a response envelope answering `message_type`.
    pub fn response(
        message_type: MessageType,
        request_id: u64,
        session_id: Option<Uuid>,
        payload: Vec<u8>,
    ) -> Result<Self, RemcamError> {
        Self::new(message_type, PayloadKind::Response, request_id, session_id, payload)
    }

    /// A `BeginSession` request. Carries no session id yet.
    pub fn begin_session(request_id: u64) -> Self {
        Self {
            message_type: MessageType::BeginSession,
            payload_kind: PayloadKind::Request,
            request_id,
            session_id: None,
            payload: Vec::new(),
        }
    }

    /// An `EndSession` request for the given session.
    pub fn end_session(request_id: u64, session_id: Uuid) -> Self {
        Self {
            message_type: MessageType::EndSession,
            payload_kind: PayloadKind::Request,
            request_id,
            session_id: Some(session_id),
            payload: Vec::new(),
        }
    }

    /// A `KillServer` request for the given session.
    pub fn kill_server(request_id: u64, session_id: Uuid) -> Self {
        Self {
            message_type: MessageType::KillServer,
            payload_kind: PayloadKind::Request,
            request_id,
            session_id: Some(session_id),
            payload: Vec::new(),
        }
    }

    fn new(
        message_type: MessageType,
        payload_kind: PayloadKind,
        request_id: u64,
        session_id: Option<Uuid>,
        payload: Vec<u8>,
    ) -> Result<Self, RemcamError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RemcamError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            message_type,
            payload_kind,
            request_id,
            session_id,
            payload,
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.payload_kind
    }

    /// Correlation identifier pairing this message with its response.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    // ── Wire form ────────────────────────────────────────────────

    fn header(&self) -> EnvelopeHeader {
        let checksum = if self.payload.is_empty() {
            0
        } else {
            payload_checksum(&self.payload)
        };
        let (flags, session_id) = match self.session_id {
            Some(id) => (EnvelopeFlags::HAS_SESSION, *id.as_bytes()),
            None => (EnvelopeFlags::empty(), [0u8; 16]),
        };
        EnvelopeHeader {
            checksum,
            message_type: self.message_type as u32,
            payload_kind: self.payload_kind as u32,
            flags: flags.bits(),
            request_id: self.request_id,
            session_id,
            payload_length: self.payload.len() as u64,
        }
    }

    /// Encode into one contiguous frame. Infallible: the payload size was
    /// enforced at construction.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        frame.extend_from_slice(&self.header().to_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Decode and validate one complete frame.
    ///
    /// Rejects bad magic, unknown discriminants, length mismatches between
    /// the header and the actual bytes, oversized payloads, and checksum
    /// failures. A rejected frame is never partially processed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemcamError> {
        if bytes.len() < HEADER_SIZE {
            return Err(RemcamError::InvalidFrameLength {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let header_bytes: &[u8; HEADER_SIZE] = bytes[..HEADER_SIZE]
            .try_into()
            .expect("slice is HEADER_SIZE bytes");
        let header = EnvelopeHeader::from_bytes(header_bytes)?;

        if header.payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(RemcamError::PayloadTooLarge {
                size: header.payload_length as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let expected = HEADER_SIZE + header.payload_length as usize;
        if bytes.len() != expected {
            return Err(RemcamError::InvalidFrameLength {
                expected,
                actual: bytes.len(),
            });
        }

        let message_type = MessageType::try_from(header.message_type)?;
        let payload_kind = PayloadKind::try_from(header.payload_kind)?;
        let flags = EnvelopeFlags::from_bits_retain(header.flags);
        let session_id = flags
            .has_session()
            .then(|| Uuid::from_bytes(header.session_id));

        let payload = bytes[HEADER_SIZE..].to_vec();
        if !payload.is_empty() && payload_checksum(&payload) != header.checksum {
            return Err(RemcamError::ChecksumMismatch);
        }

        Ok(Self {
            message_type,
            payload_kind,
            request_id: header.request_id,
            session_id,
            payload,
        })
    }
}

/// First four bytes of the blake3 hash, little-endian.
fn payload_checksum(payload: &[u8]) -> u32 {
    let hash = blake3::hash(payload);
    u32::from_le_bytes(
        hash.as_bytes()[0..4]
            .try_into()
            .expect("hash is at least 4 bytes"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_session_and_payload() {
        let id = Uuid::new_v4();
        let env = Envelope::request(
            MessageType::Command,
            7,
            Some(id),
            b"options".to_vec(),
        )
        .unwrap();
        let decoded = Envelope::from_bytes(&env.to_bytes()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.session_id(), Some(id));
        assert_eq!(decoded.payload(), b"options");
    }

    #[test]
    fn roundtrip_without_session() {
        let env = Envelope::begin_session(1);
        let decoded = Envelope::from_bytes(&env.to_bytes()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.session_id(), None);
        assert!(decoded.payload().is_empty());
    }

    #[test]
    fn payload_too_large_at_construction() {
        let result = Envelope::request(
            MessageType::Command,
            1,
            None,
            vec![0u8; MAX_PAYLOAD_SIZE + 1],
        );
        assert!(matches!(result, Err(RemcamError::PayloadTooLarge { .. })));
    }

    #[test]
    fn truncated_frame_rejected() {
        let env = Envelope::begin_session(1);
        let bytes = env.to_bytes();
        assert!(Envelope::from_bytes(&bytes[..HEADER_SIZE - 1]).is_err());
    }

    #[test]
    fn length_mismatch_rejected() {
        let env = Envelope::request(MessageType::Command, 1, None, b"abc".to_vec()).unwrap();
        let mut bytes = env.to_bytes();
        bytes.push(0); // trailing garbage
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(RemcamError::InvalidFrameLength { .. })
        ));
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let env = Envelope::request(MessageType::Command, 1, None, b"abc".to_vec()).unwrap();
        let mut bytes = env.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(RemcamError::ChecksumMismatch)
        ));
    }

    #[test]
    fn unknown_message_type_rejected() {
        let env = Envelope::begin_session(1);
        let mut bytes = env.to_bytes();
        bytes[8..12].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            Envelope::from_bytes(&bytes),
            Err(RemcamError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn kill_server_builder_carries_session() {
        let id = Uuid::new_v4();
        let env = Envelope::kill_server(3, id);
        assert_eq!(env.message_type(), MessageType::KillServer);
        assert_eq!(env.session_id(), Some(id));
        assert_eq!(env.request_id(), 3);
    }
}
