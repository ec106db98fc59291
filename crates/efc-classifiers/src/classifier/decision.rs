//! Decision rules applied to per-model energies.
use ndarray::Array1;

use crate::error::{EfcError, Result};

/// Outcome of the multiclass rule for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Index into the class vocabulary.
    Class(usize),
    /// Rejected by the winning model's cutoff.
    Unknown,
}

/// Binary rule: `true` (base class) when the energy is strictly below the cutoff.
pub fn binary_decision(energies: &Array1<f64>, cutoff: f64) -> Vec<bool> {
    energies.iter().map(|&e| e < cutoff).collect()
}

/// Multiclass rule over one energy vector per class model.
///
/// Each sample goes to the model with the minimum energy; ties keep the lowest
/// class index. With `unknown_class`, a winner whose energy is above its own
/// cutoff yields [`Decision::Unknown`].
///
/// # Returns
///
/// The decisions and the winning energy of every sample.
///
/// # Errors
///
/// `EfcError::Validation` when there are no models, when the number of
/// cutoffs differs from the number of energy vectors, or when the energy
/// vectors have different lengths.
pub fn multiclass_decision(
    energies: &[Array1<f64>],
    cutoffs: &[f64],
    unknown_class: bool,
) -> Result<(Vec<Decision>, Array1<f64>)> {
    if energies.is_empty() || energies.len() != cutoffs.len() {
        return Err(EfcError::validation(format!(
            "need one cutoff per class model, got {} energy vectors and {} cutoffs",
            energies.len(),
            cutoffs.len()
        )));
    }
    let n_samples = energies[0].len();
    if energies.iter().any(|e| e.len() != n_samples) {
        return Err(EfcError::validation(
            "energy vectors of the class models have different lengths",
        ));
    }

    let mut decisions = Vec::with_capacity(n_samples);
    let mut winning = Array1::<f64>::zeros(n_samples);
    for row in 0..n_samples {
        let mut best_idx = 0;
        let mut best = energies[0][row];
        for (idx, model_energies) in energies.iter().enumerate().skip(1) {
            if model_energies[row] < best {
                best = model_energies[row];
                best_idx = idx;
            }
        }
        winning[row] = best;
        decisions.push(if unknown_class && best > cutoffs[best_idx] {
            Decision::Unknown
        } else {
            Decision::Class(best_idx)
        });
    }

    Ok((decisions, winning))
}
