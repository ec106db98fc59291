use ndarray::{Array1, Array2};

use crate::error::{EfcError, Result};
use crate::models::coupling::flat_index;

/// Local fields `h_i(a)` for every (feature, value), in log form.
///
/// `h_i(a) = ln(f_i(a) / f_i(ref)) - sum_{j != i} sum_{b != ref} e_ij(a, b) f_j(b)`
/// where `e` are the log-domain couplings and `ref = max_bin - 1`. Reference
/// entries are zero.
pub fn local_fields(coupling: &Array2<f64>, sitefreq: &Array2<f64>, max_bin: usize) -> Result<Array1<f64>> {
    let n_features = sitefreq.nrows();
    let full = n_features * max_bin;
    if sitefreq.ncols() != max_bin || coupling.dim() != (full, full) {
        return Err(EfcError::validation(format!(
            "coupling matrix {:?} does not match {} features with max_bin {}",
            coupling.dim(),
            n_features,
            max_bin
        )));
    }

    let mut fields = Array1::<f64>::zeros(full);
    if max_bin < 2 {
        return Ok(fields);
    }
    let reference = max_bin - 1;

    for i in 0..n_features {
        for a in 0..reference {
            let row = flat_index(i, a, max_bin);
            let mut mean_field = 0.0;
            for j in (0..n_features).filter(|&j| j != i) {
                for b in 0..reference {
                    mean_field += coupling[(row, flat_index(j, b, max_bin))] * sitefreq[(j, b)];
                }
            }
            fields[row] = (sitefreq[(i, a)] / sitefreq[(i, reference)]).ln() - mean_field;
        }
    }

    if let Some(bad) = fields.iter().position(|h| !h.is_finite()) {
        return Err(EfcError::numerical(format!(
            "local field of feature {} value {} is not finite",
            bad / max_bin,
            bad % max_bin
        )));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coupling::coupling_matrix;
    use crate::models::frequencies::{pair_frequencies, site_frequencies};
    use approx::assert_abs_diff_eq;

    #[test]
    fn closed_form_two_constant_features() {
        // f(0) = 0.75, f(1) = 0.25, e_01(0,0) = 2 -> h = ln 3 - 2 * 0.75
        let x = ndarray::Array2::<usize>::zeros((10, 2));
        let site = site_frequencies(x.view(), 2, 0.5).unwrap();
        let pair = pair_frequencies(x.view(), &site, 2, 0.5).unwrap();
        let coupling = coupling_matrix(&pair, &site, 2).unwrap();
        let fields = local_fields(&coupling, &site, 2).unwrap();

        let expected = 3f64.ln() - 1.5;
        assert_abs_diff_eq!(fields[0], expected, epsilon = 1e-9);
        assert_abs_diff_eq!(fields[2], expected, epsilon = 1e-9);
        assert_eq!(fields[1], 0.0);
        assert_eq!(fields[3], 0.0);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let site = ndarray::Array2::<f64>::from_elem((2, 2), 0.5);
        let coupling = ndarray::Array2::<f64>::zeros((3, 3));
        assert!(local_fields(&coupling, &site, 2).is_err());
    }
}
