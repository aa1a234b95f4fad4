//! Server-side error types.

use std::net::SocketAddr;
use thiserror::Error;

use crate::camera::CameraError;
use remcam_core::RemcamError;

/// Errors that abort server startup or operation.
///
/// Startup errors are fatal by design: no partial server is ever left
/// running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The pool must contain at least one worker.
    #[error("worker count must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    /// The broker socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A protocol-layer failure surfaced outside a connection context.
    #[error("protocol error: {0}")]
    Protocol(#[from] RemcamError),

    /// The camera collaborator failed outside a request context.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
}
