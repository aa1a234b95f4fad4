//! # remcam-server
//!
//! The remcam broker service: a TCP front door, a single-session gate, a
//! pool of capture workers, and a two-phase shutdown handshake.
//!
//! - **Camera**: the `capture()` seam, a subprocess-backed backend and a
//!   test-pattern backend
//! - **Worker**: pool members pulling from the shared work queue
//! - **Broker**: the coordinating loop that owns all session state
//! - **Listener**: accept loop and per-client reader/writer tasks
//! - **Server**: lifecycle from bind to fully-joined teardown

pub mod broker;
pub mod camera;
pub mod config;
pub mod error;
pub mod listener;
pub mod server;
pub mod worker;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use broker::{Broker, ClientEvent, Shutdown};
pub use camera::{Camera, CameraError, SharedCamera, StillCamera, TestPatternCamera};
pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::ServerError;
pub use server::Server;
pub use worker::{Dispatch, Worker};
