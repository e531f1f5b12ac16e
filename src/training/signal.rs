//! Checkpoint handshake with an external pipeline orchestrator
//!
//! When the run is driven by DVC, `DVC_ROOT` names the project root. After
//! each checkpoint the trainer creates an empty marker file at
//! `<root>/.dvc/tmp/DVC_CHECKPOINT` and blocks until the orchestrator has
//! recorded the checkpoint and deleted the marker.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::utils::error::{MnistError, Result};

/// Environment variable naming the pipeline root directory
pub const PIPELINE_ROOT_ENV: &str = "DVC_ROOT";

/// Location of the marker file relative to the pipeline root
pub const SIGNAL_FILE: [&str; 3] = [".dvc", "tmp", "DVC_CHECKPOINT"];

/// Marker-file rendezvous with the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSignal {
    path: PathBuf,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl PipelineSignal {
    /// Signal rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let path = SIGNAL_FILE
            .iter()
            .fold(root.as_ref().to_path_buf(), |path, part| path.join(part));

        Self {
            path,
            poll_interval: Duration::from_millis(100),
            timeout: None,
        }
    }

    /// Signal for the pipeline named by `DVC_ROOT`, if any.
    ///
    /// An unset or empty variable means the run is not under the
    /// orchestrator and no handshake takes place.
    pub fn from_env() -> Option<Self> {
        match env::var_os(PIPELINE_ROOT_ENV) {
            Some(root) if !root.is_empty() => Some(Self::new(root)),
            _ => None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Bound the wait for the acknowledgment; unbounded by default
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the marker file and wait until the orchestrator removes it
    pub fn checkpoint(&self) -> Result<()> {
        self.raise()?;
        info!("Checkpoint signalled, waiting for acknowledgment at {:?}", self.path);
        self.wait_for_ack()?;
        info!("Checkpoint acknowledged");
        Ok(())
    }

    /// Write the empty marker file
    pub fn raise(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, b"")?;
        debug!("Created {:?}", self.path);
        Ok(())
    }

    /// Block until the marker file is gone
    pub fn wait_for_ack(&self) -> Result<()> {
        let start = Instant::now();

        while self.path.exists() {
            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    return Err(MnistError::Signal(
                        self.path.clone(),
                        format!("still present after {:.1}s", timeout.as_secs_f64()),
                    ));
                }
            }
            thread::sleep(self.poll_interval);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_signal_path_layout() {
        let signal = PipelineSignal::new("/project");
        assert_eq!(signal.path(), Path::new("/project/.dvc/tmp/DVC_CHECKPOINT"));
    }

    #[test]
    fn test_raise_creates_empty_file() {
        let root = TempDir::new().unwrap();
        let signal = PipelineSignal::new(root.path());

        signal.raise().unwrap();

        let metadata = fs::metadata(signal.path()).unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn test_checkpoint_returns_once_file_is_deleted() {
        let root = TempDir::new().unwrap();
        let signal = PipelineSignal::new(root.path())
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Some(Duration::from_secs(10)));

        let path = signal.path().to_path_buf();
        let orchestrator = thread::spawn(move || {
            while !path.exists() {
                thread::sleep(Duration::from_millis(5));
            }
            fs::remove_file(&path).unwrap();
        });

        signal.checkpoint().unwrap();
        orchestrator.join().unwrap();
        assert!(!signal.path().exists());
    }

    #[test]
    fn test_wait_times_out() {
        let root = TempDir::new().unwrap();
        let signal = PipelineSignal::new(root.path())
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Some(Duration::from_millis(30)));

        let result = signal.checkpoint();
        assert!(matches!(result, Err(MnistError::Signal(_, _))));
    }

    #[test]
    fn test_wait_without_marker_returns_immediately() {
        let root = TempDir::new().unwrap();
        let signal = PipelineSignal::new(root.path()).with_timeout(Some(Duration::ZERO));
        assert!(signal.wait_for_ack().is_ok());
    }
}
