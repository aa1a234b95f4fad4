//! Server lifecycle.
//!
//! Owns startup validation, the endpoints, the worker pool, and the
//! two-phase termination handshake: broadcast one shutdown token, then
//! join every worker before returning. Nothing survives `run`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info};

use crate::broker::{Broker, Shutdown};
use crate::camera::{shared, Camera, SharedCamera};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::listener;
use crate::worker::Worker;

/// A bound, not-yet-running server.
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    camera: SharedCamera,
}

impl Server {
    /// Validate the configuration and bind the broker socket.
    ///
    /// Fails fast: a rejected configuration or an unbindable address never
    /// leaves a partial server behind.
    pub async fn bind(config: ServerConfig, camera: Box<dyn Camera>) -> Result<Self, ServerError> {
        if config.worker_count < 1 {
            return Err(ServerError::InvalidWorkerCount(config.worker_count));
        }
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        info!(
            addr = %config.bind_addr,
            backend = camera.describe(),
            "broker socket bound"
        );
        Ok(Self {
            config,
            listener,
            camera: shared(camera),
        })
    }

    /// The actually bound address (useful with an OS-assigned port).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until an authorized `KillServer` or an interrupt, then tear the
    /// whole pool down. Returns only after every worker has been joined
    /// and every endpoint released.
    pub async fn run(self) -> Result<Shutdown, ServerError> {
        let (event_tx, event_rx) = mpsc::channel(128);
        let (work_tx, work_rx) = mpsc::channel(self.config.queue_depth);
        let (result_tx, result_rx) = mpsc::channel(self.config.queue_depth);
        let (shutdown_tx, _) = broadcast::channel(1);

        let queue = Arc::new(Mutex::new(work_rx));
        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            workers.push(Worker::spawn(
                id,
                queue.clone(),
                result_tx.clone(),
                shutdown_tx.subscribe(),
                self.camera.clone(),
                self.config.output_dir.clone(),
            ));
        }
        // Workers hold the only remaining result senders; the channel
        // closes exactly when the pool is gone.
        drop(result_tx);

        let accept = listener::spawn(self.listener, event_tx);
        let broker = Broker::new(event_rx, work_tx, result_rx);

        info!(workers = self.config.worker_count, "server running");
        let shutdown = tokio::select! {
            shutdown = broker.run() => shutdown,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; abandoning in-flight work");
                Shutdown::Interrupted
            }
        };

        // Two-phase teardown: one broadcast token, then join the pool. An
        // error here means no worker was listening anymore, which is fine.
        let _ = shutdown_tx.send(());
        for (id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = id, error = %e, "worker task failed to join cleanly");
            }
        }
        accept.abort();

        info!(?shutdown, "server terminated");
        Ok(shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::TestPatternCamera;

    #[tokio::test]
    async fn zero_workers_is_rejected_before_binding() {
        let config = ServerConfig {
            worker_count: 0,
            ..Default::default()
        };
        let result = Server::bind(config, Box::new(TestPatternCamera::new())).await;
        assert!(matches!(result, Err(ServerError::InvalidWorkerCount(0))));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let first = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = Server::bind(first, Box::new(TestPatternCamera::new()))
            .await
            .unwrap();
        let taken = server.local_addr().unwrap();

        let second = ServerConfig {
            bind_addr: taken,
            ..Default::default()
        };
        let result = Server::bind(second, Box::new(TestPatternCamera::new())).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
