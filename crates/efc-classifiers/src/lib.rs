//! efc-classifiers: energy-based flow classification.
//!
//! Every known class gets a statistical energy model built from the
//! co-occurrence statistics of its discretized features: smoothed site and
//! pair frequencies, a coupling matrix from the inverse of their correlation
//! structure, and per-value local fields. Samples are scored by energy and
//! compared against per-class cutoffs learned from the training energies.
//!
//! Input is an integer matrix of already discretized features with values in
//! `[0, max_bin)`; discretization itself is left to the caller.
pub mod classifier;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod models;
pub mod stats;

pub use classifier::{EnergyClassifier, PredictOptions, Prediction};
pub use config::EfcConfig;
pub use data_handling::{ClassLabel, Target, TargetType};
pub use error::{EfcError, Result};
pub use models::EnergyModel;
