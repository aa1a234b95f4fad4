//! The broker loop.
//!
//! One coordinating task multiplexes between two inbound directions:
//! client traffic (fed by the listener's per-connection reader tasks) and
//! worker results. Session state lives here and only here; workers never
//! see it, clients never set it.
//!
//! Session-control responses are produced synchronously inside the
//! iteration that consumed the request, so they can never reorder against
//! their trigger. Command responses flow back whenever a worker finishes
//! and are routed to the exact connection that issued the request.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::worker::Dispatch;
use remcam_core::{Envelope, MessageType, ResponsePayload, SessionGate, Verdict};

/// Traffic from the listener to the broker.
#[derive(Debug)]
pub enum ClientEvent {
    /// A client connected; `sender` feeds its writer task.
    Connected {
        client_id: u64,
        sender: mpsc::Sender<Envelope>,
    },
    /// A decoded envelope arrived from a client.
    Message { client_id: u64, envelope: Envelope },
    /// A client's connection ended.
    Disconnected { client_id: u64 },
}

/// Why the broker loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// An authorized `KillServer` was processed.
    Commanded,
    /// The loop was abandoned from outside (interrupt, listener gone).
    Interrupted,
}

/// The coordinating loop and the state it exclusively owns.
pub struct Broker {
    gate: SessionGate,
    clients: HashMap<u64, mpsc::Sender<Envelope>>,
    events: mpsc::Receiver<ClientEvent>,
    work: mpsc::Sender<Dispatch>,
    results: mpsc::Receiver<Dispatch>,
}

impl Broker {
    pub fn new(
        events: mpsc::Receiver<ClientEvent>,
        work: mpsc::Sender<Dispatch>,
        results: mpsc::Receiver<Dispatch>,
    ) -> Self {
        Self {
            gate: SessionGate::new(),
            clients: HashMap::new(),
            events,
            work,
            results,
        }
    }

    /// Run until an authorized `KillServer` arrives or the event source
    /// disappears. The caller performs pool teardown after this returns.
    pub async fn run(mut self) -> Shutdown {
        loop {
            tokio::select! {
                Some(dispatch) = self.results.recv() => {
                    self.deliver(dispatch).await;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("event source closed; stopping broker");
                        return Shutdown::Interrupted;
                    };
                    if let Some(shutdown) = self.handle_event(event).await {
                        return shutdown;
                    }
                }
            }
        }
    }

    async fn handle_event(&mut self, event: ClientEvent) -> Option<Shutdown> {
        match event {
            ClientEvent::Connected { client_id, sender } => {
                debug!(client = client_id, "client registered");
                self.clients.insert(client_id, sender);
                None
            }
            ClientEvent::Disconnected { client_id } => {
                debug!(client = client_id, "client deregistered");
                self.clients.remove(&client_id);
                None
            }
            ClientEvent::Message {
                client_id,
                envelope,
            } => self.handle_message(client_id, envelope).await,
        }
    }

    async fn handle_message(&mut self, client_id: u64, envelope: Envelope) -> Option<Shutdown> {
        let message_type = envelope.message_type();
        let request_id = envelope.request_id();
        debug!(client = client_id, %message_type, request = request_id, "admitting");

        match self.gate.admit(&envelope) {
            Verdict::Forward => {
                if self
                    .work
                    .send(Dispatch {
                        client_id,
                        envelope,
                    })
                    .await
                    .is_err()
                {
                    // Should only happen while tearing down.
                    warn!(client = client_id, "worker pool unavailable");
                    let session_id = self.gate.session_id();
                    self.reply(
                        client_id,
                        message_type,
                        request_id,
                        session_id,
                        ResponsePayload::failure("worker pool unavailable"),
                    )
                    .await;
                }
                None
            }
            Verdict::Reply {
                response,
                session_id,
            } => {
                self.reply(client_id, message_type, request_id, session_id, response)
                    .await;
                None
            }
            Verdict::ReplyAndShutdown {
                response,
                session_id,
            } => {
                self.reply(client_id, message_type, request_id, session_id, response)
                    .await;
                info!(client = client_id, "shutdown authorized");
                Some(Shutdown::Commanded)
            }
        }
    }

    async fn reply(
        &mut self,
        client_id: u64,
        answers: MessageType,
        request_id: u64,
        session_id: Option<Uuid>,
        response: ResponsePayload,
    ) {
        let envelope = match response.into_envelope(answers, request_id, session_id) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(client = client_id, error = %e, "failed to encode reply");
                return;
            }
        };
        self.deliver(Dispatch {
            client_id,
            envelope,
        })
        .await;
    }

    /// Route a response to the connection that issued the request. A
    /// vanished client costs a log line, nothing more.
    async fn deliver(&mut self, dispatch: Dispatch) {
        let Some(sender) = self.clients.get(&dispatch.client_id).cloned() else {
            warn!(
                client = dispatch.client_id,
                "client disconnected before response delivery"
            );
            return;
        };
        if sender.send(dispatch.envelope).await.is_err() {
            warn!(
                client = dispatch.client_id,
                "client writer gone; dropping response"
            );
            self.clients.remove(&dispatch.client_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remcam_core::{ExitCode, RequestPayload};
    use std::time::Duration;
    use uuid::Uuid;

    struct Harness {
        events: mpsc::Sender<ClientEvent>,
        work: mpsc::Receiver<Dispatch>,
        results: mpsc::Sender<Dispatch>,
        broker: tokio::task::JoinHandle<Shutdown>,
    }

    fn spawn_broker() -> Harness {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (work_tx, work_rx) = mpsc::channel(16);
        let (result_tx, result_rx) = mpsc::channel(16);
        let broker = tokio::spawn(Broker::new(event_rx, work_tx, result_rx).run());
        Harness {
            events: event_tx,
            work: work_rx,
            results: result_tx,
            broker,
        }
    }

    async fn register_client(harness: &Harness, client_id: u64) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(16);
        harness
            .events
            .send(ClientEvent::Connected {
                client_id,
                sender: tx,
            })
            .await
            .unwrap();
        rx
    }

    async fn send_message(harness: &Harness, client_id: u64, envelope: Envelope) {
        harness
            .events
            .send(ClientEvent::Message {
                client_id,
                envelope,
            })
            .await
            .unwrap();
    }

    async fn next_reply(rx: &mut mpsc::Receiver<Envelope>) -> (Envelope, ResponsePayload) {
        let envelope = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout")
            .expect("reply channel closed");
        let body = ResponsePayload::from_bytes(envelope.payload()).unwrap();
        (envelope, body)
    }

    async fn begin_session(
        harness: &Harness,
        client_id: u64,
        rx: &mut mpsc::Receiver<Envelope>,
    ) -> Uuid {
        send_message(harness, client_id, Envelope::begin_session(1)).await;
        let (envelope, body) = next_reply(rx).await;
        assert_eq!(body.exit_code, ExitCode::Success);
        envelope.session_id().expect("session id missing")
    }

    #[tokio::test]
    async fn command_before_session_is_rejected_locally() {
        let harness = spawn_broker();
        let mut rx = register_client(&harness, 1).await;

        let envelope =
            Envelope::request(MessageType::Command, 5, None, Vec::new()).unwrap();
        send_message(&harness, 1, envelope).await;

        let (envelope, body) = next_reply(&mut rx).await;
        assert_eq!(body.exit_code, ExitCode::Failure);
        assert_eq!(envelope.request_id(), 5);
    }

    #[tokio::test]
    async fn authorized_command_is_forwarded_with_client_tag() {
        let mut harness = spawn_broker();
        let mut rx = register_client(&harness, 7).await;
        let session = begin_session(&harness, 7, &mut rx).await;

        let envelope = RequestPayload::new().into_envelope(2, session).unwrap();
        send_message(&harness, 7, envelope).await;

        let job = tokio::time::timeout(Duration::from_secs(5), harness.work.recv())
            .await
            .expect("timeout")
            .expect("work channel closed");
        assert_eq!(job.client_id, 7);
        assert_eq!(job.envelope.request_id(), 2);
        assert_eq!(job.envelope.session_id(), Some(session));
    }

    #[tokio::test]
    async fn worker_results_route_to_issuing_client() {
        let harness = spawn_broker();
        let mut rx_a = register_client(&harness, 1).await;
        let mut rx_b = register_client(&harness, 2).await;

        let reply = ResponsePayload::success("done")
            .into_envelope(MessageType::Command, 9, None)
            .unwrap();
        harness
            .results
            .send(Dispatch {
                client_id: 2,
                envelope: reply,
            })
            .await
            .unwrap();

        let (envelope, body) = next_reply(&mut rx_b).await;
        assert_eq!(envelope.request_id(), 9);
        assert!(body.exit_code.is_success());
        // Client 1 got nothing.
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn kill_replies_then_returns_commanded() {
        let harness = spawn_broker();
        let mut rx = register_client(&harness, 1).await;
        let session = begin_session(&harness, 1, &mut rx).await;

        send_message(&harness, 1, Envelope::kill_server(3, session)).await;

        let (envelope, body) = next_reply(&mut rx).await;
        assert_eq!(body.exit_code, ExitCode::Success);
        assert_eq!(envelope.request_id(), 3);

        let shutdown = tokio::time::timeout(Duration::from_secs(5), harness.broker)
            .await
            .expect("broker did not stop")
            .expect("broker panicked");
        assert_eq!(shutdown, Shutdown::Commanded);
    }

    #[tokio::test]
    async fn event_source_closing_interrupts_the_loop() {
        let harness = spawn_broker();
        drop(harness.events);
        let shutdown = tokio::time::timeout(Duration::from_secs(5), harness.broker)
            .await
            .expect("broker did not stop")
            .expect("broker panicked");
        assert_eq!(shutdown, Shutdown::Interrupted);
    }
}
