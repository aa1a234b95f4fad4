//! The camera collaborator seam.
//!
//! Workers only ever see the [`Camera`] trait: one `capture` call, image
//! bytes out. The real backend shells out to the platform's still-capture
//! tool; the test-pattern backend produces deterministic bytes so the rest
//! of the server can be exercised without hardware.
//!
//! Exactly one camera device exists, so the server wraps whichever backend
//! it uses in a [`SharedCamera`] mutex. Captures serialize across the pool
//! regardless of the configured worker count.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised by a camera backend. Workers convert every one of these
/// into a `Failure` response; they never cross the channel boundary.
#[derive(Debug, Error)]
pub enum CameraError {
    /// Spawning the capture command or reading its output failed.
    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The capture command ran but reported failure.
    #[error("capture command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    /// The capture command succeeded but produced no image bytes.
    #[error("capture produced an empty image")]
    EmptyCapture,

    /// Forced failure from the test-pattern backend.
    #[error("simulated capture failure")]
    Simulated,
}

/// A device that can take one still picture per call.
#[async_trait]
pub trait Camera: Send {
    /// Capture a still image using the given capture-tool arguments and
    /// return its bytes.
    async fn capture(&mut self, args: &[String]) -> Result<Vec<u8>, CameraError>;

    /// Short backend name for logs.
    fn describe(&self) -> &'static str;
}

/// The camera handle shared by every worker. The mutex is the explicit
/// serialization point for the single physical device.
pub type SharedCamera = Arc<Mutex<Box<dyn Camera>>>;

/// Wrap a backend for sharing across the pool.
pub fn shared(camera: Box<dyn Camera>) -> SharedCamera {
    Arc::new(Mutex::new(camera))
}

// ── StillCamera ──────────────────────────────────────────────────

/// Backend that shells out to a still-capture command (`raspistill` on a
/// Raspberry Pi), collecting the JPEG through a scratch file.
pub struct StillCamera {
    command: String,
    scratch_dir: PathBuf,
    shots: u64,
}

impl StillCamera {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            scratch_dir: std::env::temp_dir(),
            shots: 0,
        }
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn capture(&mut self, args: &[String]) -> Result<Vec<u8>, CameraError> {
        self.shots += 1;
        let scratch = self
            .scratch_dir
            .join(format!("remcam-{}-{}.jpg", std::process::id(), self.shots));

        debug!(command = %self.command, ?args, "invoking capture tool");
        let output = tokio::process::Command::new(&self.command)
            .args(args)
            .arg("-o")
            .arg(&scratch)
            .output()
            .await?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(CameraError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(&scratch).await?;
        let _ = tokio::fs::remove_file(&scratch).await;
        if bytes.is_empty() {
            return Err(CameraError::EmptyCapture);
        }
        Ok(bytes)
    }

    fn describe(&self) -> &'static str {
        "still"
    }
}

// ── TestPatternCamera ────────────────────────────────────────────

/// Backend producing a fixed frame, or a forced error, without touching
/// any hardware.
pub struct TestPatternCamera {
    frame: Vec<u8>,
    fail: bool,
}

impl TestPatternCamera {
    pub fn new() -> Self {
        // SOI marker, recognizable filler, EOI marker.
        let mut frame = vec![0xFF, 0xD8];
        frame.extend_from_slice(b"remcam test pattern");
        frame.extend_from_slice(&[0xFF, 0xD9]);
        Self { frame, fail: false }
    }

    /// A backend whose every capture fails.
    pub fn failing() -> Self {
        Self {
            frame: Vec::new(),
            fail: true,
        }
    }
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Camera for TestPatternCamera {
    async fn capture(&mut self, _args: &[String]) -> Result<Vec<u8>, CameraError> {
        if self.fail {
            return Err(CameraError::Simulated);
        }
        Ok(self.frame.clone())
    }

    fn describe(&self) -> &'static str {
        "test-pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_returns_jpeg_markers() {
        let mut camera = TestPatternCamera::new();
        let bytes = camera.capture(&[]).await.unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn failing_pattern_reports_simulated() {
        let mut camera = TestPatternCamera::failing();
        let err = camera.capture(&[]).await.unwrap_err();
        assert!(matches!(err, CameraError::Simulated));
    }

    #[tokio::test]
    async fn still_camera_reports_command_failure() {
        // `false` exits non-zero on every platform this runs on.
        let mut camera = StillCamera::new("false");
        let err = camera.capture(&[]).await.unwrap_err();
        assert!(matches!(err, CameraError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn still_camera_reports_missing_command() {
        let mut camera = StillCamera::new("remcam-no-such-command");
        let err = camera.capture(&[]).await.unwrap_err();
        assert!(matches!(err, CameraError::Io(_)));
    }
}
