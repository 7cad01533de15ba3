use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::model::sird::{check_conservation, Compartment, CompartmentState, InitialConditions};

/// Daily observed head counts, indexable by day offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedSeries {
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub recovered: Vec<f64>,
    pub deceased: Vec<f64>,
}

impl ObservedSeries {
    pub fn new(susceptible: Vec<f64>, infected: Vec<f64>, recovered: Vec<f64>, deceased: Vec<f64>) -> Result<Self> {
        let n = susceptible.len();
        if infected.len() != n || recovered.len() != n || deceased.len() != n {
            return Err(CalibrationError::config(format!(
                "observed columns differ in length (S={}, I={}, R={}, D={})",
                n,
                infected.len(),
                recovered.len(),
                deceased.len()
            )));
        }
        Ok(Self { susceptible, infected, recovered, deceased })
    }

    pub fn from_states(states: &[CompartmentState]) -> Self {
        Self {
            susceptible: states.iter().map(|s| s.s).collect(),
            infected: states.iter().map(|s| s.i).collect(),
            recovered: states.iter().map(|s| s.r).collect(),
            deceased: states.iter().map(|s| s.d).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.susceptible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.susceptible.is_empty()
    }

    fn require(&self, needed: usize) -> Result<()> {
        if needed > self.len() {
            return Err(CalibrationError::InsufficientData { needed, available: self.len() });
        }
        Ok(())
    }

    pub fn initial_conditions(&self, day: usize, population: f64) -> Result<InitialConditions> {
        self.require(day.saturating_add(1))?;
        Ok(InitialConditions {
            population,
            s: self.susceptible[day],
            i: self.infected[day],
            r: self.recovered[day],
            d: self.deceased[day],
        })
    }

    /// Rows `[start, end)` divided by `population`.
    pub fn window(&self, start: usize, end: usize, population: f64) -> Result<ReferenceWindow> {
        self.require(end)?;
        let slice = |col: &[f64]| -> Vec<f64> { col[start.min(end)..end].iter().map(|v| v / population).collect() };
        Ok(ReferenceWindow {
            s: slice(&self.susceptible),
            i: slice(&self.infected),
            r: slice(&self.recovered),
            d: slice(&self.deceased),
        })
    }
}

/// Observed compartments over a window, as fractions of the population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceWindow {
    pub s: Vec<f64>,
    pub i: Vec<f64>,
    pub r: Vec<f64>,
    pub d: Vec<f64>,
}

impl ReferenceWindow {
    pub fn from_states(states: &[CompartmentState]) -> Self {
        let obs = ObservedSeries::from_states(states);
        Self { s: obs.susceptible, i: obs.infected, r: obs.recovered, d: obs.deceased }
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn get(&self, c: Compartment) -> &[f64] {
        match c {
            Compartment::Susceptible => &self.s,
            Compartment::Infected => &self.i,
            Compartment::Recovered => &self.r,
            Compartment::Deceased => &self.d,
        }
    }

    /// Fails on the first day whose normalized sum is below `threshold`.
    pub fn check_conservation(&self, threshold: f64) -> Result<f64> {
        let sums = (0..self.len()).map(|t| self.s[t] + self.i[t] + self.r[t] + self.d[t]);
        check_conservation(sums, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> ObservedSeries {
        ObservedSeries::new(
            vec![90.0, 80.0, 70.0],
            vec![10.0, 15.0, 20.0],
            vec![0.0, 4.0, 8.0],
            vec![0.0, 1.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn window_is_normalized_and_half_open() {
        let w = series().window(1, 3, 100.0).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.s, vec![0.8, 0.7]);
        assert_eq!(w.d, vec![0.01, 0.02]);
        assert!((w.check_conservation(0.99).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_requests_report_insufficient_data() {
        let s = series();
        assert_eq!(
            s.window(1, 4, 100.0).unwrap_err(),
            CalibrationError::InsufficientData { needed: 4, available: 3 }
        );
        assert!(s.initial_conditions(3, 100.0).is_err());
        assert_eq!(s.initial_conditions(2, 100.0).unwrap().i, 20.0);
        assert!(s.initial_conditions(usize::MAX, 100.0).is_err());
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        assert!(ObservedSeries::new(vec![1.0], vec![], vec![1.0], vec![1.0]).is_err());
    }
}
