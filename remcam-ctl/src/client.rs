//! Session-aware broker client.
//!
//! One request in flight at a time: send, then wait for the envelope whose
//! correlation id matches. Anything else on the wire is stale and skipped.

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use remcam_core::{
    Connection, ConnectionInfo, Envelope, OptionValue, RemcamError, RequestPayload,
    ResponsePayload,
};

/// How long to wait for a correlated reply before giving up.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// A decoded broker reply.
#[derive(Debug)]
pub struct Reply {
    /// The session id the broker echoed, if any.
    pub session_id: Option<Uuid>,
    /// Exit code and status message.
    pub body: ResponsePayload,
}

/// Client handle over one broker connection.
pub struct CamClient {
    conn: Connection,
    next_request_id: u64,
}

impl CamClient {
    pub async fn connect(info: &ConnectionInfo) -> Result<Self, std::io::Error> {
        let conn = Connection::connect(info).await?;
        Ok(Self {
            conn,
            next_request_id: 1,
        })
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    async fn roundtrip(&mut self, envelope: Envelope) -> Result<Reply, RemcamError> {
        let request_id = envelope.request_id();
        self.conn.send(envelope).await?;
        let wait = async {
            loop {
                let Some(reply) = self.conn.recv().await else {
                    return Err(RemcamError::ChannelClosed);
                };
                if reply.request_id() != request_id {
                    continue;
                }
                let body = ResponsePayload::from_bytes(reply.payload())?;
                return Ok(Reply {
                    session_id: reply.session_id(),
                    body,
                });
            }
        };
        tokio::time::timeout(REPLY_TIMEOUT, wait)
            .await
            .unwrap_or(Err(RemcamError::Timeout(REPLY_TIMEOUT)))
    }

    /// Open a session. On success the reply carries the issued id.
    pub async fn begin_session(&mut self) -> Result<Reply, RemcamError> {
        let id = self.next_id();
        self.roundtrip(Envelope::begin_session(id)).await
    }

    /// Issue a capture command under the given session.
    pub async fn command(
        &mut self,
        session: Uuid,
        options: BTreeMap<String, OptionValue>,
    ) -> Result<Reply, RemcamError> {
        let id = self.next_id();
        let envelope = RequestPayload { options }.into_envelope(id, session)?;
        self.roundtrip(envelope).await
    }

    /// Close the session.
    pub async fn end_session(&mut self, session: Uuid) -> Result<Reply, RemcamError> {
        let id = self.next_id();
        self.roundtrip(Envelope::end_session(id, session)).await
    }

    /// Terminate the server and its worker pool.
    pub async fn kill_server(&mut self, session: Uuid) -> Result<Reply, RemcamError> {
        let id = self.next_id();
        self.roundtrip(Envelope::kill_server(id, session)).await
    }
}
