pub mod convergence_log;
pub mod series;
pub mod solutions;
