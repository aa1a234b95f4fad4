//! TCP front door.
//!
//! The accept loop assigns each connection a client id and spawns a pair
//! of tasks per client: a reader decoding frames into [`ClientEvent`]s and
//! a writer draining the broker's responses into the socket. A codec error
//! on the reader drops that client; nobody else is affected.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::broker::ClientEvent;
use remcam_core::{Envelope, EnvelopeCodec};
use tokio_util::codec::Framed;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Spawn the accept loop. Aborted by the lifecycle during teardown.
pub fn spawn(listener: TcpListener, events: mpsc::Sender<ClientEvent>) -> JoinHandle<()> {
    tokio::spawn(accept_loop(listener, events))
}

async fn accept_loop(listener: TcpListener, events: mpsc::Sender<ClientEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
                debug!(client = client_id, peer = %peer_addr, "connection accepted");
                tokio::spawn(serve_client(stream, client_id, events.clone()));
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}

async fn serve_client(stream: TcpStream, client_id: u64, events: mpsc::Sender<ClientEvent>) {
    let (mut sink, mut frames) = Framed::new(stream, EnvelopeCodec).split();
    let (writer_tx, mut writer_rx) = mpsc::channel::<Envelope>(64);

    if events
        .send(ClientEvent::Connected {
            client_id,
            sender: writer_tx,
        })
        .await
        .is_err()
    {
        return; // broker already gone
    }

    // Writer: ends once every sender is dropped, after draining what was
    // queued. That drain is what flushes the reply to a kill request.
    let writer = tokio::spawn(async move {
        while let Some(envelope) = writer_rx.recv().await {
            if let Err(e) = sink.send(envelope).await {
                warn!(client = client_id, error = %e, "write failed");
                break;
            }
        }
    });

    while let Some(result) = frames.next().await {
        match result {
            Ok(envelope) => {
                if events
                    .send(ClientEvent::Message {
                        client_id,
                        envelope,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                // Malformed bytes carry no identity to answer; log and drop.
                warn!(client = client_id, error = %e, "dropping client on protocol error");
                break;
            }
        }
    }

    let _ = events
        .send(ClientEvent::Disconnected { client_id })
        .await;
    let _ = writer.await;
    debug!(client = client_id, "connection closed");
}
