//! Capture workers.
//!
//! Each worker is an independently scheduled task looping over two wakeup
//! sources: the shared work queue and the pool-wide shutdown broadcast.
//! Workers are session-agnostic; anything that reaches them has already
//! been authorized by the session gate.
//!
//! On the shutdown token a worker exits immediately. Jobs still sitting in
//! the queue are abandoned; delivery after a kill is best-effort by design.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::camera::SharedCamera;
use remcam_core::{options, Envelope, MessageType, RequestPayload, ResponsePayload};

/// One unit of routed traffic: an envelope tagged with the client
/// connection it belongs to. Used for both directions of the internal
/// fan-out.
#[derive(Debug)]
pub struct Dispatch {
    pub client_id: u64,
    pub envelope: Envelope,
}

/// Receiver end of the shared work queue. Any worker may take any job.
pub type WorkQueue = Arc<Mutex<mpsc::Receiver<Dispatch>>>;

/// A capture worker.
pub struct Worker {
    id: usize,
    queue: WorkQueue,
    results: mpsc::Sender<Dispatch>,
    shutdown: broadcast::Receiver<()>,
    camera: SharedCamera,
    output_dir: PathBuf,
    captures: u64,
}

impl Worker {
    /// Spawn a worker task. The returned handle completes once the worker
    /// has observed the shutdown token (or every queue sender is gone).
    pub fn spawn(
        id: usize,
        queue: WorkQueue,
        results: mpsc::Sender<Dispatch>,
        shutdown: broadcast::Receiver<()>,
        camera: SharedCamera,
        output_dir: PathBuf,
    ) -> JoinHandle<()> {
        let worker = Self {
            id,
            queue,
            results,
            shutdown,
            camera,
            output_dir,
            captures: 0,
        };
        tokio::spawn(worker.run())
    }

    async fn run(mut self) {
        debug!(worker = self.id, "worker started");
        loop {
            let dispatch = tokio::select! {
                _ = self.shutdown.recv() => break,
                job = next_job(&self.queue) => match job {
                    Some(job) => job,
                    None => break, // queue closed, broker is gone
                },
            };

            let request_id = dispatch.envelope.request_id();
            let session_id = dispatch.envelope.session_id();
            let response = self.handle(&dispatch.envelope).await;

            let reply = match response.into_envelope(MessageType::Command, request_id, session_id)
            {
                Ok(reply) => reply,
                Err(e) => {
                    error!(worker = self.id, error = %e, "failed to encode response");
                    continue;
                }
            };
            if self
                .results
                .send(Dispatch {
                    client_id: dispatch.client_id,
                    envelope: reply,
                })
                .await
                .is_err()
            {
                break; // result channel closed, broker is gone
            }
        }
        debug!(worker = self.id, "worker exiting");
    }

    /// Execute one command. Every failure ends up as a `Failure` response;
    /// nothing here panics or propagates.
    async fn handle(&mut self, envelope: &Envelope) -> ResponsePayload {
        let request = match RequestPayload::from_bytes(envelope.payload()) {
            Ok(request) => request,
            Err(e) => return ResponsePayload::failure(format!("malformed command payload: {e}")),
        };
        let args = match options::render_args(&request.options) {
            Ok(args) => args,
            Err(e) => return ResponsePayload::failure(e.to_string()),
        };

        debug!(worker = self.id, request = envelope.request_id(), "capturing");
        let image = {
            // One physical device: the mutex serializes captures across the
            // pool no matter how many workers are configured.
            let mut camera = self.camera.lock().await;
            camera.capture(&args).await
        };
        let image = match image {
            Ok(image) => image,
            Err(e) => return ResponsePayload::failure(format!("capture failed: {e}")),
        };

        self.captures += 1;
        let path = self
            .output_dir
            .join(format!("capture-w{}-{:04}.jpg", self.id, self.captures));
        match tokio::fs::write(&path, &image).await {
            Ok(()) => ResponsePayload::success(format!(
                "captured {} bytes to {}",
                image.len(),
                path.display()
            )),
            Err(e) => ResponsePayload::failure(format!("failed to store image: {e}")),
        }
    }
}

async fn next_job(queue: &WorkQueue) -> Option<Dispatch> {
    queue.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{shared, TestPatternCamera};
    use remcam_core::payload::OptionValue;
    use remcam_core::ExitCode;
    use std::time::Duration;
    use uuid::Uuid;

    struct Pool {
        work: mpsc::Sender<Dispatch>,
        results: mpsc::Receiver<Dispatch>,
        shutdown: broadcast::Sender<()>,
        handles: Vec<JoinHandle<()>>,
        _output: tempfile::TempDir,
    }

    fn spawn_pool(count: usize, camera: Box<dyn crate::camera::Camera>) -> Pool {
        let output = tempfile::tempdir().unwrap();
        let (work_tx, work_rx) = mpsc::channel(16);
        let (result_tx, result_rx) = mpsc::channel(16);
        let (shutdown_tx, _) = broadcast::channel(1);
        let queue = Arc::new(Mutex::new(work_rx));
        let camera = shared(camera);
        let handles = (0..count)
            .map(|id| {
                Worker::spawn(
                    id,
                    queue.clone(),
                    result_tx.clone(),
                    shutdown_tx.subscribe(),
                    camera.clone(),
                    output.path().to_path_buf(),
                )
            })
            .collect();
        Pool {
            work: work_tx,
            results: result_rx,
            shutdown: shutdown_tx,
            handles,
            _output: output,
        }
    }

    fn command(request_id: u64, options: RequestPayload) -> Dispatch {
        Dispatch {
            client_id: 1,
            envelope: options.into_envelope(request_id, Uuid::new_v4()).unwrap(),
        }
    }

    async fn response_of(pool: &mut Pool) -> (u64, ResponsePayload) {
        let dispatch = tokio::time::timeout(Duration::from_secs(5), pool.results.recv())
            .await
            .expect("timeout")
            .expect("result channel closed");
        let body = ResponsePayload::from_bytes(dispatch.envelope.payload()).unwrap();
        (dispatch.envelope.request_id(), body)
    }

    #[tokio::test]
    async fn capture_produces_success_and_artifact() {
        let mut pool = spawn_pool(1, Box::new(TestPatternCamera::new()));
        pool.work
            .send(command(
                1,
                RequestPayload::new().with_option("brightness", OptionValue::Int(70)),
            ))
            .await
            .unwrap();

        let (request_id, body) = response_of(&mut pool).await;
        assert_eq!(request_id, 1);
        assert_eq!(body.exit_code, ExitCode::Success);
        assert!(body.msg.contains("captured"));

        let files: Vec<_> = std::fs::read_dir(pool._output.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn invalid_option_yields_failure_without_capture() {
        let mut pool = spawn_pool(1, Box::new(TestPatternCamera::new()));
        pool.work
            .send(command(
                2,
                RequestPayload::new().with_option("brightness", OptionValue::Int(999)),
            ))
            .await
            .unwrap();

        let (_, body) = response_of(&mut pool).await;
        assert_eq!(body.exit_code, ExitCode::Failure);
        assert!(body.msg.contains("brightness"));

        let files: Vec<_> = std::fs::read_dir(pool._output.path()).unwrap().collect();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn camera_failure_becomes_failure_response() {
        let mut pool = spawn_pool(1, Box::new(TestPatternCamera::failing()));
        pool.work
            .send(command(3, RequestPayload::new()))
            .await
            .unwrap();

        let (_, body) = response_of(&mut pool).await;
        assert_eq!(body.exit_code, ExitCode::Failure);
        assert!(body.msg.contains("capture failed"));
    }

    #[tokio::test]
    async fn malformed_body_becomes_failure_response() {
        let mut pool = spawn_pool(1, Box::new(TestPatternCamera::new()));
        let envelope = Envelope::request(
            MessageType::Command,
            4,
            Some(Uuid::new_v4()),
            vec![0xFF; 3], // not a RequestPayload
        )
        .unwrap();
        pool.work
            .send(Dispatch {
                client_id: 1,
                envelope,
            })
            .await
            .unwrap();

        let (_, body) = response_of(&mut pool).await;
        assert_eq!(body.exit_code, ExitCode::Failure);
        assert!(body.msg.contains("malformed"));
    }

    #[tokio::test]
    async fn shutdown_token_stops_every_worker() {
        let pool = spawn_pool(3, Box::new(TestPatternCamera::new()));
        pool.shutdown.send(()).unwrap();
        for handle in pool.handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("worker did not exit")
                .expect("worker panicked");
        }
    }

    #[tokio::test]
    async fn queue_close_stops_workers_too() {
        let pool = spawn_pool(2, Box::new(TestPatternCamera::new()));
        drop(pool.work);
        for handle in pool.handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("worker did not exit")
                .expect("worker panicked");
        }
    }
}
