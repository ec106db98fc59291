//! The per-class energy model and the numeric stages it is built from.
pub mod base;
pub mod coupling;
pub mod energy;
pub mod fields;
pub mod frequencies;

pub use base::EnergyModel;
