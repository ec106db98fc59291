//! Energy of samples under a fitted coupling matrix and local fields.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::data_handling::check_bins;
use crate::error::{EfcError, Result};
use crate::models::coupling::flat_index;

/// Energy of a single discretized sample.
///
/// `E(x) = -sum_{i<j} e[(i, x_i), (j, x_j)] - sum_i h[(i, x_i)]`. Lower values
/// mean the sample is more consistent with the model.
pub fn sample_energy(coupling: &Array2<f64>, fields: &Array1<f64>, max_bin: usize, sample: ArrayView1<usize>) -> f64 {
    let n_features = sample.len();
    let mut energy = 0.0;
    for i in 0..n_features {
        let row = flat_index(i, sample[i], max_bin);
        for j in (i + 1)..n_features {
            energy -= coupling[(row, flat_index(j, sample[j], max_bin))];
        }
        energy -= fields[row];
    }
    energy
}

/// Energies of every row of `x`. Rows are scored in parallel; each row is
/// summed in a fixed order so the result does not depend on scheduling.
pub fn compute_energies(
    coupling: &Array2<f64>,
    fields: &Array1<f64>,
    max_bin: usize,
    x: ArrayView2<usize>,
) -> Result<Array1<f64>> {
    let expected = fields.len();
    if x.ncols() * max_bin != expected || coupling.dim() != (expected, expected) {
        return Err(EfcError::validation(format!(
            "samples with {} features do not match a model of {} (feature, value) entries",
            x.ncols(),
            expected
        )));
    }
    check_bins(x, max_bin)?;

    let energies: Vec<f64> = (0..x.nrows())
        .into_par_iter()
        .map(|r| sample_energy(coupling, fields, max_bin, x.row(r)))
        .collect();

    Ok(Array1::from_vec(energies))
}
