//! Prediction and evaluation
//!
//! Models passed here should be in inference mode (`AutodiffModule::valid`)
//! so no autodiff graph is recorded.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::{backend::Backend, Int, Tensor};
use tracing::info;

use crate::dataset::{class_name, MnistBatch, MnistBatcher, MnistDataset};
use crate::model::ConvNet;
use crate::utils::error::{MnistError, Result};
use crate::utils::metrics::Metrics;

/// Prediction scores (logits) for every item of `dataset`, in order.
///
/// Shape: [dataset.len(), num_classes]
pub fn predict<B: Backend>(
    model: &ConvNet<B>,
    dataset: &MnistDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    if dataset.is_empty() {
        return Err(MnistError::InvalidInput("cannot predict on an empty dataset".into()));
    }
    if batch_size == 0 {
        return Err(MnistError::InvalidInput("batch_size must be greater than 0".into()));
    }

    let batcher = MnistBatcher::new();
    let len = dataset.len();
    let mut scores = Vec::with_capacity(len.div_ceil(batch_size));

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();

        let batch: MnistBatch<B> = batcher.batch(items, device);
        scores.push(model.forward(batch.images));
    }

    Ok(Tensor::cat(scores, 0))
}

/// Arg-max label of each row of `scores`
pub fn predict_labels<B: Backend>(scores: Tensor<B, 2>) -> Result<Vec<usize>> {
    let [rows, _] = scores.dims();
    let labels: Tensor<B, 1, Int> = scores.argmax(1).reshape([rows]);

    labels
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map(|values| values.into_iter().map(|v| v as usize).collect())
        .map_err(|e| MnistError::InvalidInput(format!("Failed to read predictions: {e:?}")))
}

/// Accuracy of `model` on `dataset`; an empty dataset scores 0
pub fn evaluate<B: Backend>(
    model: &ConvNet<B>,
    dataset: &MnistDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<Metrics> {
    if dataset.is_empty() {
        return Ok(Metrics { acc: 0.0 });
    }

    let scores = predict(model, dataset, batch_size, device)?;
    let predictions = predict_labels(scores)?;
    Metrics::from_predictions(&dataset.labels(), &predictions)
}

/// Evaluate and overwrite the metrics file
pub fn evaluate_and_save<B: Backend>(
    model: &ConvNet<B>,
    dataset: &MnistDataset,
    batch_size: usize,
    device: &B::Device,
    metrics_path: &Path,
) -> Result<Metrics> {
    let metrics = evaluate(model, dataset, batch_size, device)?;
    metrics.save(metrics_path)?;
    info!("Test accuracy {:.4} written to {:?}", metrics.acc, metrics_path);
    Ok(metrics)
}

/// One row of `predict` output
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// Index in the dataset
    pub index: usize,
    /// Ground truth label
    pub label: usize,
    /// Predicted class index
    pub predicted_class: usize,
    /// Predicted class name
    pub class_name: String,
    /// Softmax probability of the predicted class
    pub confidence: f32,
}

impl PredictionResult {
    pub fn is_correct(&self) -> bool {
        self.label == self.predicted_class
    }
}

/// Per-item predictions with confidences for the first `limit` items
pub fn predict_items<B: Backend>(
    model: &ConvNet<B>,
    dataset: &MnistDataset,
    limit: usize,
    device: &B::Device,
) -> Result<Vec<PredictionResult>> {
    let count = limit.min(dataset.len());
    if count == 0 {
        return Ok(Vec::new());
    }

    let items: Vec<_> = (0..count).filter_map(|i| dataset.get(i)).collect();
    let labels: Vec<usize> = items.iter().map(|item| item.label).collect();

    let batch: MnistBatch<B> = MnistBatcher::new().batch(items, device);
    let probabilities = model.forward_softmax(batch.images);
    let [_, num_classes] = probabilities.dims();

    let predictions = predict_labels(probabilities.clone())?;
    let probabilities = probabilities
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| MnistError::InvalidInput(format!("Failed to read probabilities: {e:?}")))?;

    Ok(labels
        .into_iter()
        .zip(predictions)
        .enumerate()
        .map(|(index, (label, predicted_class))| PredictionResult {
            index,
            label,
            predicted_class,
            class_name: class_name(predicted_class).unwrap_or("unknown").to_string(),
            confidence: probabilities[index * num_classes + predicted_class],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MnistItem, MnistSplit};
    use crate::model::ConvNetConfig;
    use burn::backend::NdArray;
    use burn::module::Param;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn tiny_dataset(len: usize) -> MnistDataset {
        let items = (0..len)
            .map(|i| MnistItem {
                image: vec![(i % 3) as f32 / 2.0; 28 * 28],
                label: i % 10,
            })
            .collect();
        MnistDataset::from_items(items, MnistSplit::Test).unwrap()
    }

    #[test]
    fn test_predict_labels_argmax() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![0.1f32, 0.9, 0.0, 2.0, -1.0, 0.5], [2, 3]),
            &device,
        );

        assert_eq!(predict_labels(scores).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_predict_covers_every_item_across_batches() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        let scores = predict(&model, &tiny_dataset(7), 3, &device).unwrap();
        assert_eq!(scores.dims(), [7, 10]);
    }

    #[test]
    fn test_predict_rejects_empty_dataset() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        assert!(predict(&model, &tiny_dataset(0), 3, &device).is_err());
    }

    #[test]
    fn test_evaluate_empty_dataset_scores_zero() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        let metrics = evaluate(&model, &tiny_dataset(0), 8, &device).unwrap();
        assert_eq!(metrics.acc, 0.0);
    }

    /// Model whose logits are the same one-hot vector for every image
    fn constant_model(class: usize, device: &<TestBackend as Backend>::Device) -> ConvNet<TestBackend> {
        let mut model = ConvNetConfig::new().init::<TestBackend>(device);
        let mut bias = vec![0.0f32; 10];
        bias[class] = 1.0;

        model.dense2.weight = Param::from_tensor(Tensor::zeros([32, 10], device));
        model.dense2.bias = Some(Param::from_tensor(Tensor::from_floats(
            TensorData::new(bias, [10]),
            device,
        )));
        model
    }

    #[test]
    fn test_evaluate_counts_exact_matches() {
        let device = Default::default();
        let model = constant_model(3, &device);

        // Labels cycle 0..9, so class 3 appears at indices 3, 13 and 23
        let metrics = evaluate(&model, &tiny_dataset(25), 7, &device).unwrap();
        assert_eq!(metrics.acc, 3.0 / 25.0);
    }

    #[test]
    fn test_constant_logits_predict_one_class() {
        let device = Default::default();
        let model = constant_model(7, &device);

        let scores = predict(&model, &tiny_dataset(5), 2, &device).unwrap();
        assert_eq!(predict_labels(scores).unwrap(), vec![7; 5]);
    }

    #[test]
    fn test_evaluate_accuracy_in_range() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        let metrics = evaluate(&model, &tiny_dataset(12), 5, &device).unwrap();
        assert!((0.0..=1.0).contains(&metrics.acc));
    }

    #[test]
    fn test_predict_items_limit_and_confidence() {
        let device = Default::default();
        let model = ConvNetConfig::new().init::<TestBackend>(&device);

        let results = predict_items(&model, &tiny_dataset(4), 10, &device).unwrap();
        assert_eq!(results.len(), 4);
        for result in &results {
            assert!(result.confidence > 0.0 && result.confidence <= 1.0);
            assert!(result.predicted_class < 10);
        }
    }
}
