//! Framed TCP connection with background reader/writer tasks.
//!
//! Wraps a `Framed` stream so callers work with [`Envelope`] values over
//! plain mpsc channels. The writer task drains queued envelopes into the
//! socket; the reader task decodes inbound frames and stops on the first
//! codec error, which drops the connection.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::codec::EnvelopeCodec;
use crate::envelope::Envelope;
use crate::error::RemcamError;

/// Sender half handed out to tasks that only write.
pub type ConnectionSender = mpsc::Sender<Envelope>;

/// A remcam connection to a single peer.
#[derive(Debug)]
pub struct Connection {
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
}

impl Connection {
    /// Wrap an established stream, spawning the reader and writer tasks.
    pub fn new(stream: TcpStream) -> Self {
        let (mut net_writer, mut net_reader) = Framed::new(stream, EnvelopeCodec).split();

        // User -> Network
        let (user_tx, mut network_rx) = mpsc::channel(64);

        // Network -> User
        let (network_tx, user_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(envelope) = network_rx.recv().await {
                if let Err(e) = net_writer.send(envelope).await {
                    warn!(error = %e, "connection write failed");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(result) = net_reader.next().await {
                match result {
                    Ok(envelope) => {
                        if network_tx.send(envelope).await.is_err() {
                            // Receiver dropped; stop reading.
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "dropping connection on decode error");
                        break;
                    }
                }
            }
        });

        Self {
            tx: user_tx,
            rx: user_rx,
        }
    }

    /// Connect to a remote broker.
    pub async fn connect(info: &ConnectionInfo) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(info.to_string()).await?;
        Ok(Self::new(stream))
    }

    /// Queue an envelope for transmission.
    pub async fn send(&self, envelope: Envelope) -> Result<(), RemcamError> {
        self.tx.send(envelope).await.map_err(RemcamError::from)
    }

    /// Receive the next inbound envelope. `None` means the peer is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Clone the sender half for use from other tasks.
    pub fn sender(&self) -> ConnectionSender {
        self.tx.clone()
    }
}

// ── ConnectionInfo ───────────────────────────────────────────────

/// Host/port pair identifying a broker endpoint.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
