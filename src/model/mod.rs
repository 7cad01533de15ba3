pub mod observed;
pub mod sird;
