//! Metrics Module for Model Evaluation
//!
//! Accuracy is the only reported metric. It is written to a small JSON file
//! (`{"acc": 0.98}`) that is overwritten after every evaluation so that
//! pipeline tooling can track it per checkpoint.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::error::{MnistError, Result};

/// Evaluation metrics persisted after every epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fraction of exact label matches (0.0 - 1.0)
    pub acc: f64,
}

impl Metrics {
    /// Compute metrics from ground truth and predicted labels
    pub fn from_predictions(labels: &[usize], predictions: &[usize]) -> Result<Self> {
        Ok(Self {
            acc: accuracy(labels, predictions)?,
        })
    }

    /// Write the metrics as JSON, replacing any previous file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;

        debug!("Metrics written to {:?}", path);
        Ok(())
    }

    /// Read metrics written by [`Metrics::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Fraction of positions where the prediction equals the label.
///
/// Returns 0.0 for empty input.
pub fn accuracy(labels: &[usize], predictions: &[usize]) -> Result<f64> {
    if labels.len() != predictions.len() {
        return Err(MnistError::InvalidInput(format!(
            "{} labels but {} predictions",
            labels.len(),
            predictions.len()
        )));
    }

    if labels.is_empty() {
        return Ok(0.0);
    }

    let correct = labels
        .iter()
        .zip(predictions)
        .filter(|(label, pred)| label == pred)
        .count();

    Ok(correct as f64 / labels.len() as f64)
}
