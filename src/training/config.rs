//! Training configuration
//!
//! Defaults: 10 epochs of Adam (lr 1e-3, state reset before every batch)
//! over shuffled batches of 512, seed 0, weights in `model.mpk` and metrics
//! in `metrics.json` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ConvNetConfig;
use crate::utils::error::{MnistError, Result};

/// Complete configuration of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,

    /// Batch size for training
    pub batch_size: usize,

    /// Batch size used for prediction and evaluation
    pub eval_batch_size: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Start every batch from a fresh Adam optimizer instead of carrying
    /// moment estimates across the run
    pub reset_optimizer_each_batch: bool,

    /// Random seed for weight init and shuffling
    pub seed: u64,

    /// Dataset cache directory
    pub data_dir: PathBuf,

    /// Download missing dataset files
    pub download: bool,

    /// Model weights file, loaded at startup when present
    pub model_path: PathBuf,

    /// Metrics JSON file, overwritten after every epoch
    pub metrics_path: PathBuf,

    /// Pause between checks for the pipeline acknowledgment
    pub poll_interval_ms: u64,

    /// Give up waiting for the acknowledgment after this many seconds
    pub signal_timeout_secs: Option<u64>,

    /// Network architecture
    pub model: ConvNetConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 512,
            eval_batch_size: 1000,
            learning_rate: 1e-3,
            reset_optimizer_each_batch: true,
            seed: 0,
            data_dir: PathBuf::from("data"),
            download: true,
            model_path: PathBuf::from("model.mpk"),
            metrics_path: PathBuf::from("metrics.json"),
            poll_interval_ms: 100,
            signal_timeout_secs: None,
            model: ConvNetConfig::new(),
        }
    }
}

impl TrainingConfig {
    /// Load a configuration from a TOML file; missing keys take defaults
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| MnistError::Config(format!("Failed to read config {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| MnistError::Config(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Reject configurations that cannot train
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(MnistError::Config("epochs must be greater than 0".into()));
        }
        if self.batch_size == 0 || self.eval_batch_size == 0 {
            return Err(MnistError::Config("batch sizes must be greater than 0".into()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(MnistError::Config("learning_rate must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(MnistError::Config("poll_interval_ms must be greater than 0".into()));
        }
        self.model.validate().map_err(MnistError::Config)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn signal_timeout(&self) -> Option<Duration> {
        self.signal_timeout_secs.map(Duration::from_secs)
    }
}
