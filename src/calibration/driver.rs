use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calibration::config::{CalibrationConfig, InsufficientDataPolicy};
use crate::calibration::fitness::{Objective, SirdProblem};
use crate::calibration::pso::{StopHandle, Swarm, Termination};
use crate::error::{CalibrationError, Result};
use crate::model::observed::ObservedSeries;
use crate::model::sird::SirdParams;

/// Best candidate of one calibrated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub index: usize,
    pub lag: usize,
    pub params: SirdParams,
    pub fitness: f64,
    pub r0: f64,
    /// Minimum population fitness per generation, generation 0 first.
    pub history: Vec<f64>,
    pub termination: Termination,
}

/// Builds the fitness problem for the window starting at `lag`.
///
/// Initial conditions come from row `lag`; the reference is rows
/// `[lag + 1, lag + days + 1)`. Observed sums are checked before returning.
pub fn prepare_segment(cfg: &CalibrationConfig, series: &ObservedSeries, lag: usize) -> Result<SirdProblem> {
    let needed = lag.checked_add(cfg.days).and_then(|n| n.checked_add(1));
    let needed = match needed {
        Some(n) if n <= series.len() => n,
        other => {
            return Err(CalibrationError::InsufficientData {
                needed: other.unwrap_or(usize::MAX),
                available: series.len(),
            })
        }
    };

    let initial = series.initial_conditions(lag, cfg.population)?;
    initial.check()?;
    let day0 = (initial.s + initial.i + initial.r + initial.d) / cfg.population;
    if !(day0 >= cfg.params_threshold) {
        return Err(CalibrationError::ConservationViolation { day: lag, sum: day0, threshold: cfg.params_threshold });
    }

    let reference = series.window(lag + 1, needed, cfg.population)?;
    reference.check_conservation(cfg.params_threshold).map_err(|e| match e {
        CalibrationError::ConservationViolation { day, sum, threshold } => {
            CalibrationError::ConservationViolation { day: lag + 1 + day, sum, threshold }
        }
        other => other,
    })?;

    Ok(SirdProblem {
        initial,
        reference,
        objective: Objective::new(&cfg.weights, cfg.loss)?,
        days: cfg.days,
        params_threshold: cfg.params_threshold,
    })
}

/// Runs the swarm over one window and keeps the best member of the final population.
///
/// The swarm draws from RNG stream `index`, so windows start from different
/// populations while the run as a whole stays reproducible.
pub fn calibrate_segment(
    cfg: &CalibrationConfig,
    series: &ObservedSeries,
    index: usize,
    lag: usize,
    stop: &StopHandle,
) -> Result<SegmentResult> {
    let problem = prepare_segment(cfg, series, lag)?;

    info!(segment = index, lag, days = cfg.days, "calibrating segment");
    let outcome = Swarm::new(cfg.swarm_config(index))?
        .with_stop_handle(stop.clone())
        .run(&problem)?;

    let (particle, best) = outcome
        .best()
        .ok_or_else(|| CalibrationError::config("population_size must be >= 1"))?;
    let params = SirdParams::from_slice(&particle.position)?;

    info!(
        segment = index,
        beta = params.beta,
        gamma = params.gamma,
        delta = params.delta,
        fitness = best.value,
        generations = outcome.generations,
        "segment calibrated"
    );

    Ok(SegmentResult {
        index,
        lag,
        params,
        fitness: best.value,
        r0: params.r0(),
        history: outcome.history.clone(),
        termination: outcome.termination,
    })
}

/// Calibrates `segments` consecutive windows, advancing `lag` by `days` each time.
pub struct Driver {
    cfg: CalibrationConfig,
    stop: StopHandle,
}

impl Driver {
    pub fn new(cfg: CalibrationConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg, stop: StopHandle::new() })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.cfg
    }

    /// Raising this finishes the running generation and skips remaining segments.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn run(&self, series: &ObservedSeries) -> Result<Vec<SegmentResult>> {
        self.run_with(series, |_| Ok::<(), CalibrationError>(()))
    }

    /// Like [`Driver::run`], handing each result to `on_segment` as soon as it is ready.
    pub fn run_with<F, E>(&self, series: &ObservedSeries, mut on_segment: F) -> std::result::Result<Vec<SegmentResult>, E>
    where
        F: FnMut(&SegmentResult) -> std::result::Result<(), E>,
        E: From<CalibrationError>,
    {
        let mut results = Vec::new();
        let mut lag = self.cfg.lag;

        for index in 0..self.cfg.segments {
            if self.stop.is_stopped() {
                warn!(segment = index, "stop requested, skipping remaining segments");
                break;
            }

            let result = match calibrate_segment(&self.cfg, series, index, lag, &self.stop) {
                Ok(r) => r,
                Err(CalibrationError::InsufficientData { needed, available })
                    if self.cfg.on_insufficient_data == InsufficientDataPolicy::Stop =>
                {
                    warn!(segment = index, needed, available, "series exhausted, ending run");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            on_segment(&result)?;
            results.push(result);
            // saturates so the next window reports InsufficientData
            lag = lag.saturating_add(self.cfg.days);
        }

        Ok(results)
    }
}
