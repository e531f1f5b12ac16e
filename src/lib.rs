//! # convnet_mnist
//!
//! Trains a small convolutional classifier on MNIST with the Burn framework
//! and reports its test accuracy.
//!
//! ## Features
//!
//! - **Checkpoint loop**: weights are saved after every epoch and reloaded on
//!   the next start, so interrupted runs resume
//! - **Metrics file**: test accuracy is written to `metrics.json` each epoch
//! - **Pipeline handshake**: under DVC (`DVC_ROOT` set) each checkpoint is
//!   signalled through a marker file and training waits for acknowledgment
//!
//! ## Modules
//!
//! - `dataset`: IDX parsing, download/caching, Burn `Dataset` and `Batcher`
//! - `model`: the CNN built with Burn
//! - `training`: epoch loop, checkpoints, configuration, pipeline signal
//! - `inference`: prediction and evaluation
//! - `utils`: errors, logging and metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use convnet_mnist::backend::TrainingBackend;
//! use convnet_mnist::training::{run_training, TrainingConfig};
//!
//! let report = run_training::<TrainingBackend>(&TrainingConfig::default())?;
//! println!("{:?}", report.final_metrics());
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

pub use dataset::{MnistBatch, MnistBatcher, MnistDataset, MnistItem, MnistSplit};
pub use model::{ConvNet, ConvNetConfig};
pub use training::{PipelineSignal, TrainingConfig, TrainingReport};
pub use utils::error::{MnistError, Result};
pub use utils::metrics::Metrics;

/// Number of digit classes
pub const NUM_CLASSES: usize = 10;

/// MNIST images are IMAGE_SIZE x IMAGE_SIZE grayscale
pub const IMAGE_SIZE: usize = 28;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
