//! remcam broker service — entry point.
//!
//! ```text
//! remcam-server <port>                       Bind and serve on <port>
//! remcam-server <port> -n 4                  Run four capture workers
//! remcam-server <port> -l error              Log level (info, error, fatal)
//! remcam-server <port> --camera test         Test-pattern backend, no hardware
//! remcam-server <port> --capture-cmd CMD     Still-capture tool to invoke
//! remcam-server <port> --output-dir DIR      Where captured images land
//! ```
//!
//! Exits 0 after a commanded (`KillServer`) shutdown, non-zero when
//! startup fails.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use remcam_server::camera::{Camera, StillCamera, TestPatternCamera};
use remcam_server::config::ServerConfig;
use remcam_server::server::Server;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "remcam-server", about = "remcam remote-camera broker service")]
struct Cli {
    /// Port on which the broker socket binds.
    port: u16,

    /// Number of capture workers in the pool.
    #[arg(short = 'n', long = "n-threads", default_value_t = 1)]
    n_threads: usize,

    /// Log level: info, error or fatal.
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,

    /// Camera backend: "still" (capture subprocess) or "test" (pattern
    /// generator, no hardware needed).
    #[arg(long, default_value = "still")]
    camera: String,

    /// Capture command invoked by the still backend.
    #[arg(long = "capture-cmd", default_value = "raspistill")]
    capture_cmd: String,

    /// Directory receiving captured images.
    #[arg(long = "output-dir", default_value = ".")]
    output_dir: PathBuf,
}

/// Map the CLI level onto a tracing directive. `fatal` has no tracing
/// equivalent and collapses to `error`.
fn level_directive(level: &str) -> &str {
    match level {
        "fatal" => "error",
        other => other,
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&cli.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("remcam-server v{}", env!("CARGO_PKG_VERSION"));

    let camera: Box<dyn Camera> = match cli.camera.as_str() {
        "still" => Box::new(StillCamera::new(cli.capture_cmd.clone())),
        "test" => Box::new(TestPatternCamera::new()),
        other => {
            error!("unknown camera backend \"{other}\" (expected still or test)");
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig {
        bind_addr: SocketAddr::from(([0, 0, 0, 0], cli.port)),
        worker_count: cli.n_threads,
        output_dir: cli.output_dir,
        ..Default::default()
    };

    let server = match Server::bind(config, camera).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
