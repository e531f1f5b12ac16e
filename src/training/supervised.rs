//! Supervised Training Implementation
//!
//! A plain training loop on Burn's optimizer API rather than the high-level
//! `Learner`. Every epoch ends with a checkpoint, a test-set evaluation and,
//! when running under a pipeline orchestrator, a blocking handshake.

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::{AutodiffModule, Module},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use super::checkpoint::{self, ModelOrigin};
use super::config::TrainingConfig;
use super::signal::PipelineSignal;
use crate::dataset::{MnistBatch, MnistBatcher, MnistDataset};
use crate::inference;
use crate::model::ConvNet;
use crate::utils::error::{MnistError, Result};
use crate::utils::logging::EpochClock;
use crate::utils::metrics::Metrics;

/// Loss and accuracy over one pass of the training set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// Mean batch loss
    pub loss: f64,
    /// Fraction of training items classified correctly while training
    pub train_accuracy: f64,
    /// Number of optimizer steps taken
    pub batches: usize,
}

/// Per-epoch record of a run
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number
    pub epoch: usize,
    pub summary: EpochSummary,
    pub test_metrics: Metrics,
}

/// Outcome of [`run_training`]
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub origin: ModelOrigin,
    pub epochs: Vec<EpochReport>,
}

impl TrainingReport {
    /// Metrics of the last completed epoch
    pub fn final_metrics(&self) -> Option<Metrics> {
        self.epochs.last().map(|report| report.test_metrics)
    }
}

/// Shuffled item order for one epoch
pub fn shuffled_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}

/// Train a single epoch.
///
/// Items are visited in a fresh random order and grouped into batches of
/// `config.batch_size`; the final batch may be smaller. With
/// `config.reset_optimizer_each_batch` the optimizer is replaced by
/// `fresh_optimizer()` before every step, so no moment estimates carry over
/// between batches.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, O>(
    mut model: ConvNet<B>,
    optimizer: &mut O,
    fresh_optimizer: &dyn Fn() -> O,
    dataset: &MnistDataset,
    config: &TrainingConfig,
    rng: &mut ChaCha8Rng,
    device: &B::Device,
    progress: Option<&ProgressBar>,
) -> Result<(ConvNet<B>, EpochSummary)>
where
    B: AutodiffBackend,
    O: Optimizer<ConvNet<B>, B>,
{
    let batch_size = config.batch_size;
    if dataset.is_empty() {
        return Err(MnistError::InvalidInput("training dataset is empty".into()));
    }
    if batch_size == 0 {
        return Err(MnistError::InvalidInput("batch_size must be greater than 0".into()));
    }

    let batcher = MnistBatcher::new();
    let indices = shuffled_indices(dataset.len(), rng);

    let mut epoch_loss = 0.0f64;
    let mut correct = 0usize;
    let mut seen = 0usize;
    let mut batches = 0usize;

    for chunk in indices.chunks(batch_size) {
        let items: Vec<_> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
        let batch: MnistBatch<B> = batcher.batch(items, device);
        let size = chunk.len();

        let (loss, logits) = model.forward_classification(batch.images, batch.targets.clone());

        let loss_value: f64 = loss.clone().into_scalar().elem();
        epoch_loss += loss_value;

        let batch_correct: i64 = logits
            .argmax(1)
            .reshape([size])
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        correct += batch_correct as usize;
        seen += size;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        if config.reset_optimizer_each_batch {
            *optimizer = fresh_optimizer();
        }
        model = optimizer.step(config.learning_rate, model, grads);

        batches += 1;
        if let Some(pb) = progress {
            pb.inc(size as u64);
            pb.set_message(format!("loss {loss_value:.4}"));
        }
    }

    let summary = EpochSummary {
        loss: epoch_loss / batches.max(1) as f64,
        train_accuracy: correct as f64 / seen.max(1) as f64,
        batches,
    };

    Ok((model, summary))
}

/// Load MNIST per `config` and run the full checkpoint loop
pub fn run_training<B: AutodiffBackend>(config: &TrainingConfig) -> Result<TrainingReport> {
    config.validate()?;

    println!("{}", "Loading Dataset...".cyan());
    let train = MnistDataset::train(&config.data_dir, config.download)?;
    let test = MnistDataset::test(&config.data_dir, config.download)?;
    println!("  Training samples: {}", train.len());
    println!("  Test samples:     {}", test.len());

    let signal = PipelineSignal::from_env().map(|signal| {
        signal
            .with_poll_interval(config.poll_interval())
            .with_timeout(config.signal_timeout())
    });
    if let Some(signal) = &signal {
        info!("Pipeline handshake enabled via {:?}", signal.path());
    }

    run_training_on::<B>(config, &train, &test, signal)
}

/// Checkpoint loop over already loaded datasets
pub fn run_training_on<B: AutodiffBackend>(
    config: &TrainingConfig,
    train: &MnistDataset,
    test: &MnistDataset,
    signal: Option<PipelineSignal>,
) -> Result<TrainingReport> {
    config.validate()?;

    let device = B::Device::default();
    B::seed(config.seed);

    let (mut model, origin) = checkpoint::load_or_init::<B>(&config.model, &config.model_path, &device)?;
    info!("Model has {} parameters", model.num_params());

    let fresh_optimizer = || AdamConfig::new().init::<B, ConvNet<B>>();
    let mut optimizer = fresh_optimizer();
    if config.reset_optimizer_each_batch {
        info!("Adam state is reset before every batch");
    }
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut clock = EpochClock::new(config.epochs);
    let mut reports = Vec::with_capacity(config.epochs);

    println!();
    println!("{}", "Starting Training...".green().bold());

    for epoch in 1..=config.epochs {
        clock.start_epoch(epoch);

        let progress = ProgressBar::new(train.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| MnistError::Config(format!("Invalid progress template: {e}")))?
                .progress_chars("#>-"),
        );

        let (trained, summary) = train_epoch(
            model,
            &mut optimizer,
            &fresh_optimizer,
            train,
            config,
            &mut rng,
            &device,
            Some(&progress),
        )?;
        model = trained;
        progress.finish_and_clear();

        checkpoint::save_model(&model, &config.model_path)?;

        let test_metrics = inference::evaluate_and_save(
            &model.valid(),
            test,
            config.eval_batch_size,
            &device,
            &config.metrics_path,
        )?;

        clock.end_epoch(summary.loss, summary.train_accuracy, test_metrics.acc);
        println!(
            "  {} Epoch {}/{} | Loss: {:.4} | Train Acc: {:.2}% | Test Acc: {:.2}%",
            "→".cyan(),
            epoch,
            config.epochs,
            summary.loss,
            summary.train_accuracy * 100.0,
            test_metrics.acc * 100.0
        );

        if let Some(signal) = &signal {
            signal.checkpoint()?;
        }

        reports.push(EpochReport {
            epoch,
            summary,
            test_metrics,
        });
    }

    let report = TrainingReport {
        origin,
        epochs: reports,
    };
    if let Some(metrics) = report.final_metrics() {
        clock.finish(metrics.acc);
    }

    Ok(report)
}
