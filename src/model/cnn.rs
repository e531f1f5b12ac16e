//! CNN Model Architecture for Digit Classification
//!
//! Two convolution stages followed by two dense layers:
//!
//! ```text
//! [n, 1, 28, 28] -> conv1 (3x3, pad 1) -> relu -> maxpool 2x2
//!                -> conv2 (3x3, pad 1) -> relu -> flatten [n, 16*14*14]
//!                -> dense1 -> relu -> dense2 -> logits [n, 10]
//! ```

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Int, Tensor},
};

use crate::{IMAGE_SIZE, NUM_CLASSES};

/// Configuration for the [`ConvNet`] model
#[derive(Config, Debug)]
pub struct ConvNetConfig {
    /// Number of output classes
    #[config(default = 10)]
    pub num_classes: usize,

    /// Number of input channels (1 for grayscale)
    #[config(default = 1)]
    pub in_channels: usize,

    /// Input image size (square)
    #[config(default = 28)]
    pub image_size: usize,

    /// Filters of the first convolution
    #[config(default = 8)]
    pub conv1_channels: usize,

    /// Filters of the second convolution
    #[config(default = 16)]
    pub conv2_channels: usize,

    /// Width of the hidden dense layer
    #[config(default = 32)]
    pub hidden_size: usize,
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvNetConfig {
    /// Length of the flattened feature vector fed to `dense1`.
    ///
    /// Only the single 2x2 pooling stage halves the spatial size; both
    /// convolutions preserve it.
    pub fn flattened_size(&self) -> usize {
        let side = self.image_size / 2;
        self.conv2_channels * side * side
    }

    /// Check the configuration describes the MNIST network shape.
    ///
    /// The batcher always yields `[n, 1, 28, 28]` images with labels below
    /// 10, so any other input or class count is rejected here.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be greater than 0".to_string());
        }
        if self.image_size == 0 || self.image_size % 2 != 0 {
            return Err("image_size must be a positive even number".to_string());
        }
        if self.in_channels == 0 || self.conv1_channels == 0 || self.conv2_channels == 0 {
            return Err("channel counts must be greater than 0".to_string());
        }
        if self.hidden_size == 0 {
            return Err("hidden_size must be greater than 0".to_string());
        }
        if self.num_classes != NUM_CLASSES {
            return Err(format!(
                "num_classes is {}, MNIST has {NUM_CLASSES} classes",
                self.num_classes
            ));
        }
        if self.image_size != IMAGE_SIZE {
            return Err(format!(
                "image_size is {}, MNIST images are {IMAGE_SIZE}x{IMAGE_SIZE}",
                self.image_size
            ));
        }
        if self.in_channels != 1 {
            return Err(format!(
                "in_channels is {}, MNIST images are grayscale",
                self.in_channels
            ));
        }
        Ok(())
    }

    /// Build a freshly initialised model on `device`
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        ConvNet::new(self, device)
    }
}

/// Toy convolutional classifier
#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub conv1: Conv2d<B>,
    pub pool1: MaxPool2d,
    pub conv2: Conv2d<B>,
    pub dense1: Linear<B>,
    pub dense2: Linear<B>,
    activation: Relu,
    flattened_size: usize,
}

impl<B: Backend> ConvNet<B> {
    pub fn new(config: &ConvNetConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([config.in_channels, config.conv1_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let pool1 = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let conv2 = Conv2dConfig::new([config.conv1_channels, config.conv2_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let flattened_size = config.flattened_size();
        let dense1 = LinearConfig::new(flattened_size, config.hidden_size).init(device);
        let dense2 = LinearConfig::new(config.hidden_size, config.num_classes).init(device);

        Self {
            conv1,
            pool1,
            conv2,
            dense1,
            dense2,
            activation: Relu::new(),
            flattened_size,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `images` - Input tensor of shape [batch_size, 1, 28, 28]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);

        let x = x.reshape([batch_size, self.flattened_size]);
        let x = self.dense1.forward(x);
        let x = self.activation.forward(x);
        self.dense2.forward(x)
    }

    /// Forward pass returning `(loss, logits)` with cross-entropy loss
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);

        (loss, logits)
    }

    /// Class probabilities
    pub fn forward_softmax(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(images), 1)
    }
}
