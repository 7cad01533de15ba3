use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::calibration::pso::FitnessFunction;
use crate::error::{CalibrationError, Result};
use crate::math::loss::LossMetric;
use crate::model::observed::ReferenceWindow;
use crate::model::sird::{Compartment, InitialConditions, SirdModel, SirdParams, Trajectory};

/// Scalar fitness of one candidate. Lower is better.
///
/// Ordered by `value` (IEEE total order), then by `ordinal` so that ties always
/// resolve to the earlier candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fitness {
    pub value: f64,
    pub ordinal: usize,
}

impl Fitness {
    pub fn new(value: f64, ordinal: usize) -> Self {
        Self { value, ordinal }
    }

    /// Lowest entry of `values`, ties to the lower index.
    pub fn best_of(values: &[f64]) -> Option<Fitness> {
        values.iter().enumerate().map(|(i, v)| Fitness::new(*v, i)).min()
    }
}

impl PartialEq for Fitness {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fitness {}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value).then(self.ordinal.cmp(&other.ordinal))
    }
}

/// Per-compartment losses plus the weights that scalarize them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub weights: [f64; 4],
    pub metric: LossMetric,
}

impl Objective {
    pub fn new(weights: &[f64], metric: LossMetric) -> Result<Self> {
        let weights: [f64; 4] = weights.try_into().map_err(|_| {
            CalibrationError::config(format!("weights must have 4 entries (S, I, R, D), got {}", weights.len()))
        })?;
        if !weights.iter().all(|w| w.is_finite() && *w >= 0.0) {
            return Err(CalibrationError::config("weights must be finite and >= 0"));
        }
        Ok(Self { weights, metric })
    }

    /// All four weights share one value: plain mean of the losses.
    pub fn is_scalar(&self) -> bool {
        self.weights.iter().all(|w| *w == self.weights[0])
    }

    /// `[lossS, lossI, lossR, lossD]` over the common length of both series.
    pub fn losses(&self, trajectory: &Trajectory, reference: &ReferenceWindow) -> [f64; 4] {
        Compartment::ALL.map(|c| self.metric.compute(&trajectory.column(c), reference.get(c)))
    }

    pub fn scalarize(&self, losses: &[f64; 4]) -> f64 {
        if self.is_scalar() {
            losses.iter().sum::<f64>() / losses.len() as f64
        } else {
            self.weights.iter().zip(losses.iter()).map(|(w, l)| w * l).sum()
        }
    }

    pub fn evaluate(&self, trajectory: &Trajectory, reference: &ReferenceWindow) -> f64 {
        self.scalarize(&self.losses(trajectory, reference))
    }
}

/// Simulator and evaluator bundled as the swarm's fitness function for one segment.
#[derive(Debug, Clone)]
pub struct SirdProblem {
    pub initial: InitialConditions,
    pub reference: ReferenceWindow,
    pub objective: Objective,
    pub days: usize,
    pub params_threshold: f64,
}

impl SirdProblem {
    pub fn simulate(&self, params: SirdParams) -> Result<Trajectory> {
        let model = SirdModel::new(params, self.initial.population)?;
        model.simulate(&self.initial, self.days, self.params_threshold)
    }
}

impl FitnessFunction for SirdProblem {
    fn evaluate(&self, position: &[f64]) -> Result<f64> {
        let trajectory = self.simulate(SirdParams::from_slice(position)?)?;
        Ok(self.objective.evaluate(&trajectory, &self.reference))
    }
}
