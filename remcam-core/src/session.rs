//! Session admission gate.
//!
//! The gate is the broker's single source of truth for session state. At
//! most one session is active at a time; every inbound envelope passes
//! through [`SessionGate::admit`] before it can reach a worker, and the
//! returned verdict tells the broker exactly what to do:
//!
//! ```text
//!  Idle ──BeginSession──► Active(id) ──EndSession(id)──► Idle
//!                             │
//!                             └──KillServer(id)──► (broker terminates)
//! ```
//!
//! The gate itself never performs I/O and is owned exclusively by the
//! broker task, so no locking is needed around session state.

use std::time::Instant;
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::message::MessageType;
use crate::payload::ResponsePayload;

// ── SessionPhase ─────────────────────────────────────────────────

/// Whether a session is currently active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No session. Initial state, and the state after every `EndSession`.
    #[default]
    Idle,

    /// A controller holds the session.
    Active {
        /// The server-issued identity token.
        id: Uuid,
        /// When the session was established.
        since: Instant,
    },
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Active { .. })
    }
}

// ── Verdict ──────────────────────────────────────────────────────

/// What the broker must do with an admitted envelope.
///
/// Replies carry the session id to echo, which is not always the gate's
/// current id: an `EndSession` reply names the session that just closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Answer the client directly; session-control outcome or rejection.
    Reply {
        response: ResponsePayload,
        session_id: Option<Uuid>,
    },
    /// Authorized `Command`: forward to the worker pool unchanged.
    Forward,
    /// Authorized `KillServer`: answer the client, then shut the pool down.
    ReplyAndShutdown {
        response: ResponsePayload,
        session_id: Option<Uuid>,
    },
}

// ── SessionGate ──────────────────────────────────────────────────

/// The admission state machine.
#[derive(Debug, Default)]
pub struct SessionGate {
    phase: SessionPhase,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The active session id, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        match self.phase {
            SessionPhase::Active { id, .. } => Some(id),
            SessionPhase::Idle => None,
        }
    }

    /// Admit one inbound envelope and decide its fate.
    ///
    /// Rejections never change state, so repeating a bad request yields
    /// the same verdict every time.
    pub fn admit(&mut self, envelope: &Envelope) -> Verdict {
        match self.phase {
            SessionPhase::Idle => self.admit_idle(envelope),
            SessionPhase::Active { id, .. } => self.admit_active(envelope, id),
        }
    }

    fn admit_idle(&mut self, envelope: &Envelope) -> Verdict {
        match envelope.message_type() {
            MessageType::BeginSession => {
                let id = Uuid::new_v4();
                self.phase = SessionPhase::Active {
                    id,
                    since: Instant::now(),
                };
                Verdict::Reply {
                    response: ResponsePayload::success(format!("session {id} established")),
                    session_id: Some(id),
                }
            }
            other => Verdict::Reply {
                response: ResponsePayload::failure(format!(
                    "a session must be initiated before {other} is accepted"
                )),
                session_id: None,
            },
        }
    }

    fn admit_active(&mut self, envelope: &Envelope, active: Uuid) -> Verdict {
        if envelope.session_id() != Some(active) {
            return Verdict::Reply {
                response: ResponsePayload::failure(match envelope.session_id() {
                    Some(sent) => format!("invalid session id {sent}"),
                    None => "invalid session id: none supplied".to_string(),
                }),
                session_id: Some(active),
            };
        }
        match envelope.message_type() {
            MessageType::Command => Verdict::Forward,
            MessageType::EndSession => {
                self.phase = SessionPhase::Idle;
                Verdict::Reply {
                    response: ResponsePayload::success(format!("session {active} terminated")),
                    session_id: Some(active),
                }
            }
            MessageType::KillServer => Verdict::ReplyAndShutdown {
                response: ResponsePayload::success("terminating server"),
                session_id: Some(active),
            },
            // Reissuing the live id would make this reply indistinguishable
            // from a fresh grant, so a second BeginSession is refused.
            MessageType::BeginSession => Verdict::Reply {
                response: ResponsePayload::failure("a session is already active"),
                session_id: Some(active),
            },
        }
    }
}
