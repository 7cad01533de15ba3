use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Element-wise error metric applied to one compartment series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossMetric {
    #[default]
    Mse,
    Rmse,
}

impl LossMetric {
    /// Compares `predicted` and `observed` over their common length.
    pub fn compute(self, predicted: &[f64], observed: &[f64]) -> f64 {
        match self {
            LossMetric::Mse => mse(predicted, observed),
            LossMetric::Rmse => rmse(predicted, observed),
        }
    }
}

impl fmt::Display for LossMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossMetric::Mse => write!(f, "mse"),
            LossMetric::Rmse => write!(f, "rmse"),
        }
    }
}

impl FromStr for LossMetric {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mse" => Ok(LossMetric::Mse),
            "rmse" => Ok(LossMetric::Rmse),
            other => Err(CalibrationError::config(format!("unknown loss metric '{other}'"))),
        }
    }
}

/// Mean squared error. Empty input yields 0.
pub fn mse(predicted: &[f64], observed: &[f64]) -> f64 {
    let n = predicted.len().min(observed.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(observed.iter())
        .map(|(p, o)| (p - o) * (p - o))
        .sum();
    sum / n as f64
}

pub fn rmse(predicted: &[f64], observed: &[f64]) -> f64 {
    mse(predicted, observed).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_series_have_zero_error() {
        let x = [0.1, 0.2, 0.3];
        assert_eq!(mse(&x, &x), 0.0);
        assert_eq!(rmse(&x, &x), 0.0);
    }

    #[test]
    fn rmse_is_root_of_mse() {
        let p = [1.0, 2.0, 3.0, 4.0];
        let o = [1.0, 1.0, 1.0, 1.0];
        // (0 + 1 + 4 + 9) / 4
        assert!((mse(&p, &o) - 3.5).abs() < 1e-12);
        assert!((rmse(&p, &o) - 3.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn uses_common_length() {
        assert!((mse(&[2.0, 9.0], &[0.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn parses_metric_names() {
        assert_eq!("RMSE".parse::<LossMetric>().unwrap(), LossMetric::Rmse);
        assert!("mae".parse::<LossMetric>().is_err());
    }
}
