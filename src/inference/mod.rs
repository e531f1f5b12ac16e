//! Inference module for prediction and evaluation
//!
//! This module provides:
//! - Batched prediction scores over a dataset
//! - Arg-max labels and per-item predictions with confidence
//! - Test-set accuracy written to the metrics file

pub mod predictor;

pub use predictor::{
    evaluate, evaluate_and_save, predict, predict_items, predict_labels, PredictionResult,
};
