//! Burn Dataset Integration for MNIST
//!
//! Implements Burn's Dataset trait and Batcher for in-memory MNIST data.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::{self, MnistSplit, RawSplit};
use crate::utils::error::{MnistError, Result};
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// A single normalized MNIST image
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MnistItem {
    /// Pixels scaled to [0, 1], row-major [28 * 28]
    pub image: Vec<f32>,
    /// Digit label (0-9)
    pub label: usize,
}

/// Whole MNIST split held in memory
#[derive(Debug, Clone)]
pub struct MnistDataset {
    items: Vec<MnistItem>,
    split: MnistSplit,
}

impl MnistDataset {
    /// Load a split from `data_dir`, downloading the files if needed and allowed
    pub fn load(data_dir: &Path, split: MnistSplit, download: bool) -> Result<Self> {
        let raw = loader::load_split(data_dir, split, download)?;
        Self::from_raw(raw, split)
    }

    pub fn train(data_dir: &Path, download: bool) -> Result<Self> {
        Self::load(data_dir, MnistSplit::Train, download)
    }

    pub fn test(data_dir: &Path, download: bool) -> Result<Self> {
        Self::load(data_dir, MnistSplit::Test, download)
    }

    /// Normalize decoded IDX data into items
    pub fn from_raw(raw: RawSplit, split: MnistSplit) -> Result<Self> {
        if raw.images.rows != IMAGE_SIZE || raw.images.cols != IMAGE_SIZE {
            return Err(MnistError::Dataset(format!(
                "expected {IMAGE_SIZE}x{IMAGE_SIZE} images, found {}x{}",
                raw.images.rows, raw.images.cols
            )));
        }

        let items = raw
            .labels
            .iter()
            .enumerate()
            .map(|(index, &label)| {
                let pixels = raw.images.image(index).ok_or_else(|| {
                    MnistError::Dataset(format!("image {index} missing from {split} split"))
                })?;
                Ok(MnistItem {
                    image: pixels.iter().map(|&p| p as f32 / 255.0).collect(),
                    label: label as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_items(items, split)
    }

    /// Build a dataset from already normalized items.
    ///
    /// Every image must hold 28 * 28 pixels and every label must be a digit.
    pub fn from_items(items: Vec<MnistItem>, split: MnistSplit) -> Result<Self> {
        const PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;

        for (index, item) in items.iter().enumerate() {
            if item.label >= NUM_CLASSES {
                return Err(MnistError::Dataset(format!(
                    "label {} at index {index} is out of range",
                    item.label
                )));
            }
            if item.image.len() != PIXELS {
                return Err(MnistError::Dataset(format!(
                    "image at index {index} has {} pixels, expected {PIXELS}",
                    item.image.len()
                )));
            }
        }

        Ok(Self { items, split })
    }

    pub fn split(&self) -> MnistSplit {
        self.split
    }

    /// Ground truth labels in dataset order
    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }

    /// Get samples per class count
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for item in &self.items {
            counts[item.label] += 1;
        }
        counts
    }

    /// Mean pixel intensity over the whole split
    pub fn mean_intensity(&self) -> f64 {
        let (sum, count) = self.items.iter().fold((0.0f64, 0usize), |(sum, count), item| {
            (
                sum + item.image.iter().map(|&p| p as f64).sum::<f64>(),
                count + item.image.len(),
            )
        });
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

impl Dataset<MnistItem> for MnistDataset {
    fn get(&self, index: usize) -> Option<MnistItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of MNIST images
#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// Images with shape [batch_size, 1, 28, 28]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher turning [`MnistItem`]s into tensors
#[derive(Clone, Debug, Default)]
pub struct MnistBatcher;

impl MnistBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.iter().copied()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 1, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        MnistBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::idx::IdxImages;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn raw_split(labels: Vec<u8>) -> RawSplit {
        let count = labels.len();
        RawSplit {
            images: IdxImages {
                count,
                rows: IMAGE_SIZE,
                cols: IMAGE_SIZE,
                pixels: vec![255u8; count * IMAGE_SIZE * IMAGE_SIZE],
            },
            labels,
        }
    }

    #[test]
    fn test_from_raw_normalizes_pixels() {
        let dataset = MnistDataset::from_raw(raw_split(vec![4, 2]), MnistSplit::Test).unwrap();

        assert_eq!(dataset.len(), 2);
        let item = dataset.get(0).unwrap();
        assert_eq!(item.label, 4);
        assert_eq!(item.image.len(), IMAGE_SIZE * IMAGE_SIZE);
        assert!(item.image.iter().all(|&p| p == 1.0));
        assert_eq!(dataset.mean_intensity(), 1.0);
    }

    #[test]
    fn test_from_raw_rejects_out_of_range_label() {
        let result = MnistDataset::from_raw(raw_split(vec![10]), MnistSplit::Train);
        assert!(matches!(result, Err(MnistError::Dataset(_))));
    }

    #[test]
    fn test_from_items_rejects_out_of_range_label() {
        let items = vec![MnistItem {
            image: vec![0.0; IMAGE_SIZE * IMAGE_SIZE],
            label: 12,
        }];
        let result = MnistDataset::from_items(items, MnistSplit::Train);
        assert!(matches!(result, Err(MnistError::Dataset(_))));
    }

    #[test]
    fn test_from_items_rejects_wrong_image_size() {
        let items = vec![MnistItem {
            image: vec![0.0; 100],
            label: 3,
        }];
        let result = MnistDataset::from_items(items, MnistSplit::Test);
        assert!(matches!(result, Err(MnistError::Dataset(_))));
    }

    #[test]
    fn test_class_distribution() {
        let dataset = MnistDataset::from_raw(raw_split(vec![1, 1, 7]), MnistSplit::Train).unwrap();
        let counts = dataset.class_distribution();
        assert_eq!(counts[1], 2);
        assert_eq!(counts[7], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let dataset = MnistDataset::from_raw(raw_split(vec![0, 5, 9]), MnistSplit::Test).unwrap();
        let items: Vec<_> = (0..dataset.len()).filter_map(|i| dataset.get(i)).collect();

        let batch: MnistBatch<TestBackend> = MnistBatcher::new().batch(items, &device);

        assert_eq!(batch.images.dims(), [3, 1, 28, 28]);
        assert_eq!(batch.targets.dims(), [3]);
        let targets = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![0, 5, 9]);
    }
}
