use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::math::ode::{euler_step_ws, StepWorkspace};

/// Transmission, recovery and mortality rates (per day).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirdParams {
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl SirdParams {
    pub const DIMENSIONS: usize = 3;

    pub fn new(beta: f64, gamma: f64, delta: f64) -> Self {
        Self { beta, gamma, delta }
    }

    /// Reads a swarm position laid out as `[beta, gamma, delta]`.
    pub fn from_slice(x: &[f64]) -> Result<Self> {
        match x {
            [beta, gamma, delta] => Ok(Self::new(*beta, *gamma, *delta)),
            _ => Err(CalibrationError::config(format!(
                "SIRD parameter vector needs {} entries, got {}",
                Self::DIMENSIONS,
                x.len()
            ))),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.beta, self.gamma, self.delta]
    }

    /// Basic reproduction number beta / (gamma + delta).
    pub fn r0(&self) -> f64 {
        let removal = self.gamma + self.delta;
        if removal > 0.0 { self.beta / removal } else { f64::INFINITY }
    }

    pub fn check(&self) -> Result<()> {
        let ok = [self.beta, self.gamma, self.delta].iter().all(|v| v.is_finite() && *v >= 0.0);
        if !ok {
            return Err(CalibrationError::config(format!(
                "SIRD rates must be finite and >= 0 (beta={}, gamma={}, delta={})",
                self.beta, self.gamma, self.delta
            )));
        }
        Ok(())
    }
}

/// Absolute head counts on day 0 of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub population: f64,
    pub s: f64,
    pub i: f64,
    pub r: f64,
    pub d: f64,
}

impl InitialConditions {
    pub fn check(&self) -> Result<()> {
        if !(self.population > 0.0) || !self.population.is_finite() {
            return Err(CalibrationError::config(format!(
                "population must be > 0, got {}",
                self.population
            )));
        }
        let ok = [self.s, self.i, self.r, self.d].iter().all(|v| v.is_finite() && *v >= 0.0);
        if !ok {
            return Err(CalibrationError::config(format!(
                "initial compartments must be finite and >= 0 (S={}, I={}, R={}, D={})",
                self.s, self.i, self.r, self.d
            )));
        }
        Ok(())
    }

    fn to_vec(&self) -> Vec<f64> {
        vec![self.s, self.i, self.r, self.d]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    Susceptible,
    Infected,
    Recovered,
    Deceased,
}

impl Compartment {
    pub const ALL: [Compartment; 4] = [
        Compartment::Susceptible,
        Compartment::Infected,
        Compartment::Recovered,
        Compartment::Deceased,
    ];
}

/// One day of the model, usually as fractions of the population.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompartmentState {
    pub s: f64,
    pub i: f64,
    pub r: f64,
    pub d: f64,
}

impl CompartmentState {
    pub fn sum(&self) -> f64 {
        self.s + self.i + self.r + self.d
    }

    pub fn get(&self, c: Compartment) -> f64 {
        match c {
            Compartment::Susceptible => self.s,
            Compartment::Infected => self.i,
            Compartment::Recovered => self.r,
            Compartment::Deceased => self.d,
        }
    }
}

/// Normalized daily states produced by [`SirdModel::simulate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub states: Vec<CompartmentState>,
    /// Smallest per-day S+I+R+D after normalization.
    pub min_sum: f64,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn column(&self, c: Compartment) -> Vec<f64> {
        self.states.iter().map(|st| st.get(c)).collect()
    }
}

/// Checks every normalized daily sum against `threshold` and returns the smallest one.
/// NaN sums count as violations.
pub fn check_conservation<I>(sums: I, threshold: f64) -> Result<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut min_sum = f64::INFINITY;
    for (day, sum) in sums.into_iter().enumerate() {
        if !(sum >= threshold) {
            return Err(CalibrationError::ConservationViolation { day, sum, threshold });
        }
        min_sum = min_sum.min(sum);
    }
    Ok(min_sum)
}

pub struct SirdModel {
    pub params: SirdParams,
    pub population: f64,
}

impl SirdModel {
    pub fn new(params: SirdParams, population: f64) -> Result<Self> {
        params.check()?;
        if !(population > 0.0) || !population.is_finite() {
            return Err(CalibrationError::config(format!("population must be > 0, got {population}")));
        }
        Ok(Self { params, population })
    }

    /// Daily flows for y = [S, I, R, D] in head counts.
    ///
    /// Each flow is capped by the mass in its source compartment, so no compartment
    /// can go below zero. When gamma + delta > 1, recovery and death share the
    /// available infected proportionally.
    pub fn deriv(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        let p = &self.params;
        let (s, i) = (y[0].max(0.0), y[1].max(0.0));

        let new_infected = (p.beta * s * i / self.population).min(s);

        let outflow = (p.gamma + p.delta) * i;
        let scale = if outflow > i { i / outflow } else { 1.0 };
        let new_recovered = p.gamma * i * scale;
        let new_deceased = p.delta * i * scale;

        dy[0] = -new_infected;
        dy[1] = new_infected - new_recovered - new_deceased;
        dy[2] = new_recovered;
        dy[3] = new_deceased;
    }

    /// Runs `days` daily states (day 0 included) and normalizes them by population.
    ///
    /// Fails with [`CalibrationError::ConservationViolation`] when any normalized daily
    /// sum is below `threshold`.
    pub fn simulate(&self, init: &InitialConditions, days: usize, threshold: f64) -> Result<Trajectory> {
        init.check()?;
        if days == 0 {
            return Err(CalibrationError::config("days must be >= 1"));
        }

        let norm = 1.0 / self.population;
        let to_state = |y: &[f64]| CompartmentState {
            s: y[0] * norm,
            i: y[1] * norm,
            r: y[2] * norm,
            d: y[3] * norm,
        };

        let mut y = init.to_vec();
        let mut ws = StepWorkspace::new(y.len());
        let mut states = Vec::with_capacity(days);
        states.push(to_state(&y));
        for t in 1..days {
            euler_step_ws(&mut y, t as f64, 1.0, &mut ws, |tt, yy, dy| self.deriv(tt, yy, dy));
            // flows are already capped; this only absorbs rounding below zero
            for v in y.iter_mut() {
                *v = v.max(0.0);
            }
            states.push(to_state(&y));
        }

        let min_sum = check_conservation(states.iter().map(CompartmentState::sum), threshold)?;
        Ok(Trajectory { states, min_sum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> InitialConditions {
        InitialConditions { population: 1000.0, s: 990.0, i: 10.0, r: 0.0, d: 0.0 }
    }

    #[test]
    fn first_step_follows_difference_equations() {
        let model = SirdModel::new(SirdParams::new(0.5, 0.1, 0.02), 1000.0).unwrap();
        let traj = model.simulate(&init(), 2, 0.99).unwrap();
        assert_eq!(traj.len(), 2);

        let new_inf = 0.5 * 990.0 * 10.0 / 1000.0;
        let day1 = traj.states[1];
        assert!((day1.s - (990.0 - new_inf) / 1000.0).abs() < 1e-12);
        assert!((day1.i - (10.0 + new_inf - 1.0 - 0.2) / 1000.0).abs() < 1e-12);
        assert!((day1.r - 1.0 / 1000.0).abs() < 1e-12);
        assert!((day1.d - 0.2 / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn initial_mass_below_threshold_is_a_violation() {
        let model = SirdModel::new(SirdParams::new(0.3, 0.1, 0.01), 1000.0).unwrap();
        let short = InitialConditions { population: 1000.0, s: 900.0, i: 10.0, r: 0.0, d: 0.0 };
        let err = model.simulate(&short, 5, 0.99).unwrap_err();
        assert!(matches!(err, CalibrationError::ConservationViolation { day: 0, .. }));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(SirdModel::new(SirdParams::new(-0.1, 0.1, 0.1), 1000.0).is_err());
        assert!(SirdModel::new(SirdParams::new(0.1, 0.1, 0.1), 0.0).is_err());
        let model = SirdModel::new(SirdParams::new(0.1, 0.1, 0.1), 1000.0).unwrap();
        assert!(model.simulate(&init(), 0, 0.99).is_err());
    }

    #[test]
    fn params_from_slice_requires_three_entries() {
        let p = SirdParams::from_slice(&[0.3, 0.1, 0.01]).unwrap();
        assert_eq!(p.to_vec(), vec![0.3, 0.1, 0.01]);
        assert!(SirdParams::from_slice(&[0.3, 0.1]).is_err());
        assert!((p.r0() - 0.3 / 0.11).abs() < 1e-12);
    }
}
