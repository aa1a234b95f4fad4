//! # remcam-core
//!
//! Protocol library for the remcam remote-camera broker.
//!
//! This crate contains:
//! - **Wire types**: `EnvelopeHeader`, `Envelope`, `MessageType`,
//!   `PayloadKind`, `EnvelopeFlags`
//! - **Payload bodies**: `RequestPayload` (command options) and
//!   `ResponsePayload` (exit code + message), serialized with `bincode`
//! - **Option catalog**: the capture options a command may carry, with
//!   domain validation and argument rendering
//! - **Session gate**: the at-most-one-active-session admission state
//!   machine driving the broker
//! - **Codec**: `EnvelopeCodec` for framed TCP I/O via `tokio_util`
//! - **Network**: `Connection` for managed TCP connections
//! - **Error**: `RemcamError`, typed `thiserror`-based hierarchy

pub mod codec;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod flags;
pub mod header;
pub mod message;
pub mod options;
pub mod payload;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::EnvelopeCodec;
pub use connection::{Connection, ConnectionInfo, ConnectionSender};
pub use envelope::{Envelope, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use error::RemcamError;
pub use flags::EnvelopeFlags;
pub use header::{EnvelopeHeader, HEADER_SIZE};
pub use message::{MessageType, PayloadKind};
pub use payload::{ExitCode, OptionValue, RequestPayload, ResponsePayload};
pub use session::{SessionGate, SessionPhase, Verdict};
