//! Dataset module for MNIST data handling
//!
//! This module provides functionality for:
//! - Parsing the IDX files MNIST is distributed as
//! - Downloading and caching the files under a local data directory
//! - Exposing the splits through Burn's `Dataset` and `Batcher` traits

pub mod burn_dataset;
pub mod idx;
pub mod loader;

pub use burn_dataset::{MnistBatch, MnistBatcher, MnistDataset, MnistItem};
pub use loader::{download_all, MnistSplit};

/// Printable name of a digit class
pub fn class_name(label: usize) -> Option<&'static str> {
    const NAMES: [&str; 10] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    ];
    NAMES.get(label).copied()
}
