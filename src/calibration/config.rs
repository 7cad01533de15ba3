use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::math::loss::LossMetric;

/// Which particles feed a particle's social term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Window of `neighborhood_size` particles centred on the particle, wrapping around.
    #[default]
    Ring,
    /// Whole population.
    Star,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Ring => write!(f, "ring"),
            Topology::Star => write!(f, "star"),
        }
    }
}

impl FromStr for Topology {
    type Err = CalibrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ring" => Ok(Topology::Ring),
            "star" => Ok(Topology::Star),
            other => Err(CalibrationError::config(format!("unknown topology '{other}'"))),
        }
    }
}

/// What the driver does when a segment window runs past the end of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientDataPolicy {
    #[default]
    Fail,
    /// Keep the segments finished so far and end the run.
    Stop,
}

/// Settings the particle swarm itself needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub dimensions: usize,
    pub population_size: usize,
    pub max_generations: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub inertia: f64,
    pub cognitive_rate: f64,
    pub social_rate: f64,
    pub topology: Topology,
    pub neighborhood_size: usize,
    pub seed: u64,
    /// ChaCha stream selected after seeding; segments of one run use distinct streams.
    #[serde(default)]
    pub stream: u64,
}

impl SwarmConfig {
    pub fn check(&self) -> Result<()> {
        require(self.dimensions >= 1, || "dimensions must be >= 1".into())?;
        require(self.population_size >= 1, || "population_size must be >= 1".into())?;
        require(self.neighborhood_size >= 1, || "neighborhood_size must be >= 1".into())?;
        require(self.lower_bound.is_finite() && self.upper_bound.is_finite(), || {
            "bounds must be finite".into()
        })?;
        require(self.lower_bound <= self.upper_bound, || {
            format!("bounds inverted: lower {} > upper {}", self.lower_bound, self.upper_bound)
        })?;
        require(
            [self.inertia, self.cognitive_rate, self.social_rate].iter().all(|v| v.is_finite()),
            || "inertia, cognitive_rate and social_rate must be finite".into(),
        )?;
        Ok(())
    }
}

/// Per-run calibration settings. Read-only once the driver starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Stem for the output files (`baseline`, `shorter_weeks`, ...).
    pub name: String,
    pub seed: u64,
    pub max_generations: usize,
    pub population_size: usize,
    /// Row offset of the first segment.
    pub lag: usize,
    /// Window length in days.
    pub days: usize,
    pub segments: usize,
    /// Minimum normalized S+I+R+D accepted on any day.
    pub params_threshold: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Total population used to normalize compartments.
    pub population: f64,
    pub inertia: f64,
    pub cognitive_rate: f64,
    pub social_rate: f64,
    pub neighborhood_size: usize,
    pub topology: Topology,
    /// Objective weights for S, I, R, D.
    pub weights: Vec<f64>,
    pub loss: LossMetric,
    pub on_insufficient_data: InsufficientDataPolicy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            name: "baseline".to_string(),
            seed: 42,
            max_generations: 100,
            population_size: 100,
            lag: 10,
            days: 70,
            segments: 1,
            params_threshold: 0.99,
            lower_bound: 0.001,
            upper_bound: 1.0,
            population: 60_000_000.0,
            inertia: 0.5,
            cognitive_rate: 2.1,
            social_rate: 2.1,
            neighborhood_size: 3,
            topology: Topology::Ring,
            weights: vec![1.0; 4],
            loss: LossMetric::Mse,
            on_insufficient_data: InsufficientDataPolicy::Fail,
        }
    }
}

impl CalibrationConfig {
    /// Ten one-week segments.
    pub fn shorter_weeks() -> Self {
        Self {
            name: "shorter_weeks".to_string(),
            days: 7,
            segments: 10,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration config: {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse calibration config: {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        require(self.population > 0.0 && self.population.is_finite(), || {
            format!("population must be > 0, got {}", self.population)
        })?;
        require(self.days >= 1, || "days must be >= 1".into())?;
        require(self.segments >= 1, || "segments must be >= 1".into())?;
        require(self.params_threshold.is_finite(), || "params_threshold must be finite".into())?;
        require(self.weights.len() == 4, || {
            format!("weights must have 4 entries (S, I, R, D), got {}", self.weights.len())
        })?;
        require(self.weights.iter().all(|w| w.is_finite() && *w >= 0.0), || {
            "weights must be finite and >= 0".into()
        })?;
        require(self.lower_bound >= 0.0, || "rates are non-negative: lower_bound must be >= 0".into())?;
        self.swarm_config(0).check()
    }

    /// Swarm settings for segment `segment`: same seed, one RNG stream per segment.
    pub fn swarm_config(&self, segment: usize) -> SwarmConfig {
        SwarmConfig {
            dimensions: 3,
            population_size: self.population_size,
            max_generations: self.max_generations,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            inertia: self.inertia,
            cognitive_rate: self.cognitive_rate,
            social_rate: self.social_rate,
            topology: self.topology,
            neighborhood_size: self.neighborhood_size,
            seed: self.seed,
            stream: segment as u64,
        }
    }
}

fn require(cond: bool, message: impl FnOnce() -> String) -> Result<()> {
    if cond { Ok(()) } else { Err(CalibrationError::InvalidConfiguration(message())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CalibrationConfig::default().validate().unwrap();
        let short = CalibrationConfig::shorter_weeks();
        short.validate().unwrap();
        assert_eq!((short.days, short.segments), (7, 10));
    }

    #[test]
    fn rejects_invalid_settings() {
        let inverted = CalibrationConfig { lower_bound: 2.0, upper_bound: 1.0, ..Default::default() };
        assert!(matches!(inverted.validate(), Err(CalibrationError::InvalidConfiguration(_))));

        let arity = CalibrationConfig { weights: vec![1.0; 3], ..Default::default() };
        assert!(arity.validate().is_err());

        let no_days = CalibrationConfig { days: 0, ..Default::default() };
        assert!(no_days.validate().is_err());

        let no_pop = CalibrationConfig { population: 0.0, ..Default::default() };
        assert!(no_pop.validate().is_err());

        let no_segments = CalibrationConfig { segments: 0, ..Default::default() };
        assert!(no_segments.validate().is_err());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg: CalibrationConfig =
            serde_json::from_str(r#"{"seed": 7, "topology": "star", "loss": "rmse"}"#).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.topology, Topology::Star);
        assert_eq!(cfg.loss, LossMetric::Rmse);
        assert_eq!(cfg.days, 70);
    }

    #[test]
    fn segments_get_their_own_stream() {
        let cfg = CalibrationConfig::default();
        assert_eq!(cfg.swarm_config(0).stream, 0);
        assert_eq!(cfg.swarm_config(3).stream, 3);
        assert_eq!(cfg.swarm_config(3).seed, cfg.seed);
    }
}
