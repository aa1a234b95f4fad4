//! Server configuration.
//!
//! The configuration surface is the CLI; there is no config file. Tests
//! construct a `ServerConfig` directly with an OS-assigned port.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default broker port.
pub const DEFAULT_PORT: u16 = 4560;

/// Everything the server lifecycle needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the broker socket binds to.
    pub bind_addr: SocketAddr,
    /// Number of capture workers in the pool. Must be at least 1.
    pub worker_count: usize,
    /// Directory receiving captured images.
    pub output_dir: PathBuf,
    /// Depth of the work and result queues.
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            worker_count: 1,
            output_dir: PathBuf::from("."),
            queue_depth: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_depth, 64);
    }
}
