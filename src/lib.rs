pub mod math;
pub mod model;
pub mod io;
pub mod calibration;
pub mod error;

pub use calibration::config::{CalibrationConfig, InsufficientDataPolicy, SwarmConfig, Topology};
pub use calibration::driver::{Driver, SegmentResult};
pub use calibration::fitness::{Fitness, Objective, SirdProblem};
pub use calibration::pso::{FitnessFunction, StopHandle, Swarm, SwarmOutcome, Termination};
pub use error::CalibrationError;
pub use math::loss::LossMetric;
pub use model::observed::{ObservedSeries, ReferenceWindow};
pub use model::sird::{CompartmentState, InitialConditions, SirdModel, SirdParams, Trajectory};
