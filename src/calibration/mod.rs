pub mod config;
pub mod driver;
pub mod fitness;
pub mod pso;
