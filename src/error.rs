use thiserror::Error;

/// Failures raised by the simulation / optimization core.
///
/// None of these are transient: every variant aborts the current segment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Normalized S+I+R+D fell below the configured minimum (or is NaN).
    #[error("conservation violated on day {day}: normalized sum {sum} < threshold {threshold}")]
    ConservationViolation { day: usize, sum: f64, threshold: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Requested window `[.., needed)` runs past the end of the series.
    #[error("insufficient data: window needs {needed} rows, series has {available}")]
    InsufficientData { needed: usize, available: usize },
}

impl CalibrationError {
    pub fn config(message: impl Into<String>) -> Self {
        CalibrationError::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
