//! Training module
//!
//! This module provides:
//! - The epoch loop with shuffled mini-batches and Adam updates
//! - Model checkpointing after every epoch
//! - The checkpoint handshake with a pipeline orchestrator
//! - Run configuration

pub mod checkpoint;
pub mod config;
pub mod signal;
pub mod supervised;

pub use checkpoint::{load_model, load_or_init, save_model, ModelOrigin};
pub use config::TrainingConfig;
pub use signal::PipelineSignal;
pub use supervised::{
    run_training, run_training_on, train_epoch, EpochReport, EpochSummary, TrainingReport,
};
