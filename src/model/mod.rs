//! Model module for the CNN architecture using the Burn framework
//!
//! The network is intentionally tiny: two 3x3 convolution stages and two
//! dense layers, enough to reach high accuracy on MNIST within a few epochs.

pub mod cnn;

pub use cnn::{ConvNet, ConvNetConfig};
