//! Errors, logging and metrics shared by the library and the CLI

pub mod error;
pub mod logging;
pub mod metrics;

use std::time::Duration;

pub use error::{MnistError, Result};
pub use logging::{init_logging, EpochClock, LogConfig};
pub use metrics::{accuracy, Metrics};

/// Render a duration as `4.2s`, `3m 07s` or `1h 05m`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..=59 => format!("{:.1}s", duration.as_secs_f64()),
        60..=3599 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, secs % 3600 / 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(187)), "3m 07s");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h 05m");
    }
}
