//! Wire-level message discriminants.
//!
//! Uses proper enums with `TryFrom`; no panics on unknown values.

use crate::error::RemcamError;
use std::fmt;

// ── MessageType ──────────────────────────────────────────────────

/// The four message types a client may send to the broker.
///
/// Discriminant values are fixed by the wire protocol; `KillServer` is
/// deliberately zero so an all-zero type field never passes for a benign
/// command by accident of initialization.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Terminate the whole server, workers included.
    KillServer = 0,
    /// Open a session and obtain its identity token.
    BeginSession = 1,
    /// Close the currently active session.
    EndSession = 2,
    /// A camera command, routed to the worker pool.
    Command = 3,
}

impl TryFrom<u32> for MessageType {
    type Error = RemcamError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::KillServer),
            1 => Ok(MessageType::BeginSession),
            2 => Ok(MessageType::EndSession),
            3 => Ok(MessageType::Command),
            _ => Err(RemcamError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::KillServer => write!(f, "KillServer"),
            MessageType::BeginSession => write!(f, "BeginSession"),
            MessageType::EndSession => write!(f, "EndSession"),
            MessageType::Command => write!(f, "Command"),
        }
    }
}

impl MessageType {
    /// Returns `true` for the session-control types, whose responses are
    /// produced synchronously by the broker itself rather than a worker.
    pub fn is_session_control(&self) -> bool {
        !matches!(self, MessageType::Command)
    }
}

// ── PayloadKind ──────────────────────────────────────────────────

/// Distinguishes request bodies (client → broker) from response bodies
/// (broker/worker → client).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// A request body, possibly empty for session-control messages.
    Request = 1,
    /// A response body carrying an exit code and a status message.
    Response = 2,
}

impl TryFrom<u32> for PayloadKind {
    type Error = RemcamError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PayloadKind::Request),
            2 => Ok(PayloadKind::Response),
            _ => Err(RemcamError::UnknownVariant {
                type_name: "PayloadKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Request => write!(f, "Request"),
            PayloadKind::Response => write!(f, "Response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrip() {
        let types = [
            MessageType::KillServer,
            MessageType::BeginSession,
            MessageType::EndSession,
            MessageType::Command,
        ];
        for t in types {
            assert_eq!(MessageType::try_from(t as u32).unwrap(), t);
        }
    }

    #[test]
    fn message_type_invalid() {
        assert!(MessageType::try_from(0xFF).is_err());
    }

    #[test]
    fn payload_kind_roundtrip() {
        assert_eq!(
            PayloadKind::try_from(PayloadKind::Request as u32).unwrap(),
            PayloadKind::Request
        );
        assert_eq!(
            PayloadKind::try_from(PayloadKind::Response as u32).unwrap(),
            PayloadKind::Response
        );
    }

    #[test]
    fn payload_kind_zero_is_invalid() {
        assert!(PayloadKind::try_from(0).is_err());
    }

    #[test]
    fn session_control_classification() {
        assert!(MessageType::BeginSession.is_session_control());
        assert!(MessageType::EndSession.is_session_control());
        assert!(MessageType::KillServer.is_session_control());
        assert!(!MessageType::Command.is_session_control());
    }
}
