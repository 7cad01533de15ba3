pub mod loss;
pub mod ode;
