//! MNIST ConvNet CLI
//!
//! Entry point for training, evaluating and inspecting the MNIST digit
//! classifier built with the Burn framework.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use convnet_mnist::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use convnet_mnist::dataset::{class_name, download_all, MnistDataset, MnistSplit};
use convnet_mnist::inference::{evaluate_and_save, predict_items};
use convnet_mnist::training::{load_model, run_training, ModelOrigin, TrainingConfig};
use convnet_mnist::utils::format_duration;
use convnet_mnist::utils::logging::{init_logging, LogConfig};

/// MNIST Digit Classification
///
/// Trains a small convolutional network on MNIST, checkpointing the weights
/// and test accuracy after every epoch.
#[derive(Parser, Debug)]
#[command(name = "convnet_mnist")]
#[command(version)]
#[command(about = "MNIST digit classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// TOML file with training configuration; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configuration file
#[derive(Args, Debug)]
struct Overrides {
    /// Dataset cache directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Model weights file
    #[arg(short, long)]
    model_path: Option<PathBuf>,

    /// Metrics JSON file
    #[arg(long)]
    metrics_path: Option<PathBuf>,

    /// Fail instead of downloading missing dataset files
    #[arg(long, default_value = "false")]
    no_download: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the model, checkpointing after every epoch
    Train {
        /// Number of training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Batch size for training
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Keep Adam moment estimates across batches instead of resetting them
        #[arg(long, default_value = "false")]
        keep_optimizer_state: bool,

        #[command(flatten)]
        paths: Overrides,
    },

    /// Evaluate a saved model on the test set and write the metrics file
    Evaluate {
        #[command(flatten)]
        paths: Overrides,
    },

    /// Print predictions for the first test images
    Predict {
        /// Number of test images to classify
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        #[command(flatten)]
        paths: Overrides,
    },

    /// Show dataset statistics
    Stats {
        #[command(flatten)]
        paths: Overrides,
    },

    /// Download the dataset without training
    Download {
        #[command(flatten)]
        paths: Overrides,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    let mut config = match &cli.config {
        Some(path) => TrainingConfig::load_toml(path)?,
        None => TrainingConfig::default(),
    };

    match cli.command {
        Commands::Train {
            epochs,
            batch_size,
            learning_rate,
            seed,
            keep_optimizer_state,
            paths,
        } => {
            if let Some(epochs) = epochs {
                config.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(learning_rate) = learning_rate {
                config.learning_rate = learning_rate;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if keep_optimizer_state {
                config.reset_optimizer_each_batch = false;
            }
            apply_overrides(&mut config, paths);
            cmd_train(&config)?;
        }

        Commands::Evaluate { paths } => {
            apply_overrides(&mut config, paths);
            cmd_evaluate(&config)?;
        }

        Commands::Predict { count, paths } => {
            apply_overrides(&mut config, paths);
            cmd_predict(&config, count)?;
        }

        Commands::Stats { paths } => {
            apply_overrides(&mut config, paths);
            cmd_stats(&config)?;
        }

        Commands::Download { paths } => {
            apply_overrides(&mut config, paths);
            cmd_download(&config)?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut TrainingConfig, overrides: Overrides) {
    if let Some(data_dir) = overrides.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(model_path) = overrides.model_path {
        config.model_path = model_path;
    }
    if let Some(metrics_path) = overrides.metrics_path {
        config.metrics_path = metrics_path;
    }
    if overrides.no_download {
        config.download = false;
    }
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════╗
 ║   MNIST ConvNet                                  ║
 ║   Digit Classification with Burn + Rust          ║
 ╚══════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn cmd_train(config: &TrainingConfig) -> Result<()> {
    config.validate()?;

    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Started:        {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("  Backend:        {}", backend_name());
    println!("  Epochs:         {}", config.epochs);
    println!("  Batch size:     {}", config.batch_size);
    println!("  Learning rate:  {}", config.learning_rate);
    println!("  Seed:           {}", config.seed);
    println!(
        "  Adam state:     {}",
        if config.reset_optimizer_each_batch { "reset every batch" } else { "kept across batches" }
    );
    println!("  Data directory: {}", config.data_dir.display());
    println!("  Model file:     {}", config.model_path.display());
    println!("  Metrics file:   {}", config.metrics_path.display());
    println!();

    let start = Instant::now();
    let report = run_training::<TrainingBackend>(config)?;

    println!();
    match &report.origin {
        ModelOrigin::Restored(path) => println!("  Resumed from {}", path.display()),
        ModelOrigin::Fresh => println!("  Started from fresh weights"),
    }
    if let Some(metrics) = report.final_metrics() {
        println!(
            "{} Final test accuracy: {:.2}% ({})",
            "Done!".green().bold(),
            metrics.acc * 100.0,
            format_duration(start.elapsed())
        );
    }

    Ok(())
}

fn cmd_evaluate(config: &TrainingConfig) -> Result<()> {
    let device = default_device();

    println!("{}", "Loading model...".cyan());
    let model = load_model::<DefaultBackend>(&config.model, &config.model_path, &device)
        .with_context(|| format!("cannot evaluate without {}", config.model_path.display()))?;

    println!("{}", "Loading test set...".cyan());
    let test = MnistDataset::test(&config.data_dir, config.download)?;

    let metrics = evaluate_and_save(
        &model,
        &test,
        config.eval_batch_size,
        &device,
        &config.metrics_path,
    )?;

    println!();
    println!(
        "  Test accuracy: {} over {} images",
        format!("{:.2}%", metrics.acc * 100.0).green().bold(),
        test.len()
    );
    println!("  Written to {}", config.metrics_path.display());

    Ok(())
}

fn cmd_predict(config: &TrainingConfig, count: usize) -> Result<()> {
    let device = default_device();

    let model = load_model::<DefaultBackend>(&config.model, &config.model_path, &device)?;
    let test = MnistDataset::test(&config.data_dir, config.download)?;

    let results = predict_items(&model, &test, count, &device)?;

    println!("{}", "Predictions:".cyan().bold());
    for result in &results {
        let actual = class_name(result.label).unwrap_or("unknown");
        let line = format!(
            "  #{:<5} predicted {:<6} ({:>5.1}%)  actual {}",
            result.index,
            result.class_name,
            result.confidence * 100.0,
            actual
        );
        if result.is_correct() {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }

    let correct = results.iter().filter(|r| r.is_correct()).count();
    println!();
    println!("  {}/{} correct", correct, results.len());

    Ok(())
}

fn cmd_stats(config: &TrainingConfig) -> Result<()> {
    for split in [MnistSplit::Train, MnistSplit::Test] {
        let dataset = MnistDataset::load(&config.data_dir, split, config.download)?;
        let total = dataset.len().max(1);

        println!("{}", format!("{split} split:").cyan().bold());
        println!("  Samples:        {}", dataset.len());
        println!("  Mean intensity: {:.4}", dataset.mean_intensity());
        println!("  Class distribution:");
        for (label, count) in dataset.class_distribution().iter().enumerate() {
            let pct = 100.0 * *count as f64 / total as f64;
            println!(
                "    {} {:<6} {:>6} ({:>5.1}%)",
                label,
                class_name(label).unwrap_or("unknown"),
                count,
                pct
            );
        }
        println!();
    }

    Ok(())
}

fn cmd_download(config: &TrainingConfig) -> Result<()> {
    println!(
        "{} {}",
        "Downloading MNIST to".cyan(),
        config.data_dir.display()
    );

    download_all(&config.data_dir)?;
    info!("Dataset ready in {:?}", config.data_dir);

    println!("{}", "Dataset ready.".green().bold());
    println!("  convnet_mnist train --data-dir {}", config.data_dir.display());

    Ok(())
}
