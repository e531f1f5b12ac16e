//! Structured logging on `tracing`
//!
//! `RUST_LOG` takes precedence over the configured level when it is set.

use std::time::{Duration, Instant};

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::format_duration;
use crate::utils::error::{MnistError, Result};

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Print the module path of each event
    pub show_target: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            show_target: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Debug level with module paths
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            show_target: true,
            ..Self::default()
        }
    }
}

/// Install the global subscriber.
///
/// Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_ansi(config.ansi)
                .with_target(config.show_target),
        )
        .with(filter)
        .try_init()
        .map_err(|e| MnistError::Config(format!("Failed to initialize logging: {e}")))
}

/// Wall-clock bookkeeping for the epoch loop
pub struct EpochClock {
    total_epochs: usize,
    run_start: Instant,
    epoch: usize,
    epoch_start: Instant,
}

impl EpochClock {
    pub fn new(total_epochs: usize) -> Self {
        let now = Instant::now();
        Self {
            total_epochs,
            run_start: now,
            epoch: 0,
            epoch_start: now,
        }
    }

    /// Mark the start of `epoch` (1-based)
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();
        info!("Epoch {}/{} started", epoch, self.total_epochs);
    }

    /// Remaining time extrapolated from the mean epoch duration so far
    pub fn eta(&self) -> Duration {
        let done = self.epoch.max(1) as u32;
        let remaining = self.total_epochs.saturating_sub(self.epoch) as u32;
        self.run_start.elapsed() / done * remaining
    }

    pub fn end_epoch(&self, loss: f64, train_accuracy: f64, test_accuracy: f64) {
        info!(
            "Epoch {}/{} done in {} | loss {:.4} | train acc {:.2}% | test acc {:.2}% | ETA {}",
            self.epoch,
            self.total_epochs,
            format_duration(self.epoch_start.elapsed()),
            loss,
            train_accuracy * 100.0,
            test_accuracy * 100.0,
            format_duration(self.eta())
        );
    }

    pub fn finish(&self, final_accuracy: f64) {
        info!(
            "Training finished: {} epochs in {}, test accuracy {:.2}%",
            self.total_epochs,
            format_duration(self.run_start.elapsed()),
            final_accuracy * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_config() {
        let config = LogConfig::verbose();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.show_target);
        assert_eq!(LogConfig::default().level, Level::INFO);
    }

    #[test]
    fn test_eta_after_last_epoch_is_zero() {
        let mut clock = EpochClock::new(3);
        clock.start_epoch(3);
        assert_eq!(clock.eta(), Duration::ZERO);
    }
}
