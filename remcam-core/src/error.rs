//! Domain-specific error types for the remcam protocol.
//!
//! All fallible operations return `Result<T, RemcamError>`.
//! No panics on invalid input; every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the remcam protocol.
#[derive(Debug, Error)]
pub enum RemcamError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not start with the RCM1 magic sequence.
    #[error("invalid magic bytes: expected RCM1")]
    InvalidMagic,

    /// The envelope payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    // ── Framing Errors ───────────────────────────────────────────
    /// The payload exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The received frame is shorter or longer than its header claims.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload body failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Application Errors ───────────────────────────────────────
    /// A command option failed catalog validation.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RemcamError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RemcamError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for RemcamError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        RemcamError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RemcamError::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = RemcamError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: RemcamError = io_err.into();
        assert!(matches!(e, RemcamError::Connection(_)));
    }

    #[test]
    fn unknown_variant_names_type() {
        let e = RemcamError::UnknownVariant {
            type_name: "MessageType",
            value: 9,
        };
        assert!(e.to_string().contains("MessageType"));
    }
}
