//! Request and response payload bodies.
//!
//! # Wire Protocol
//!
//! ```text
//! Client ──[Command / Request]────────────────► Broker ──► Worker
//!   Payload: RequestPayload (bincode)
//!
//! Worker ──[Command / Response]───────────────► Broker ──► Client
//!   Payload: ResponsePayload (bincode)
//!
//! Broker ──[session-control / Response]───────► Client
//!   Payload: ResponsePayload (bincode)
//! ```
//!
//! Session-control requests (`BeginSession`, `EndSession`, `KillServer`)
//! carry an empty body; everything they need lives in the envelope header.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::RemcamError;
use crate::message::MessageType;

// ── OptionValue ───────────────────────────────────────────────────

/// A single command option value: integer or text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OptionValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Text(v) => write!(f, "{v}"),
        }
    }
}

// ── RequestPayload ────────────────────────────────────────────────

/// Body of a `Command` request: named capture options.
///
/// A `BTreeMap` keeps the option set deterministically ordered, which in
/// turn keeps the rendered capture-tool arguments stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestPayload {
    pub options: BTreeMap<String, OptionValue>,
}

impl RequestPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one option.
    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Serialize to bytes for an envelope payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RemcamError> {
        bincode::serialize(self).map_err(|e| RemcamError::Encoding(e.to_string()))
    }

    /// Deserialize from envelope payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemcamError> {
        bincode::deserialize(bytes).map_err(|e| RemcamError::Encoding(e.to_string()))
    }

    /// Build a `Command` request envelope carrying this body.
    pub fn into_envelope(
        self,
        request_id: u64,
        session_id: Uuid,
    ) -> Result<Envelope, RemcamError> {
        let payload = self.to_bytes()?;
        Envelope::request(MessageType::Command, request_id, Some(session_id), payload)
    }
}

// ── ExitCode ──────────────────────────────────────────────────────

/// Outcome of a request. `Failure` is variant 0 so the wire encoding
/// matches the protocol's numbering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitCode {
    Failure,
    Success,
}

impl ExitCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Failure => write!(f, "Failure"),
            ExitCode::Success => write!(f, "Success"),
        }
    }
}

// ── ResponsePayload ───────────────────────────────────────────────

/// Body of every response: an exit code plus a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponsePayload {
    pub exit_code: ExitCode,
    pub msg: String,
}

impl ResponsePayload {
    /// Successful outcome.
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Success,
            msg: msg.into(),
        }
    }

    /// Failed outcome.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Failure,
            msg: msg.into(),
        }
    }

    /// Serialize to bytes for an envelope payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RemcamError> {
        bincode::serialize(self).map_err(|e| RemcamError::Encoding(e.to_string()))
    }

    /// Deserialize from envelope payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RemcamError> {
        bincode::deserialize(bytes).map_err(|e| RemcamError::Encoding(e.to_string()))
    }

    /// Build a response envelope answering a request of type `answers`.
    ///
    /// The request's correlation id is preserved verbatim; `session_id` is
    /// whatever identity the responder wants to echo (the active session,
    /// or `None` when no session exists).
    pub fn into_envelope(
        self,
        answers: MessageType,
        request_id: u64,
        session_id: Option<Uuid>,
    ) -> Result<Envelope, RemcamError> {
        let payload = self.to_bytes()?;
        Envelope::response(answers, request_id, session_id, payload)
    }
}
