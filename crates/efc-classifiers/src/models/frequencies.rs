//! Empirical site and pair frequencies with pseudocount smoothing.
//!
//! Every frequency is blended with a uniform prior:
//! `(1 - pseudocounts) * empirical + pseudocounts / max_bin` for sites and
//! `pseudocounts / max_bin^2` for pairs, so that summing a pair block over one
//! feature gives back the site frequency of the other.
use ndarray::{Array2, Array4, ArrayView2};

use crate::data_handling::check_bins;
use crate::error::{EfcError, Result};

/// Smoothed frequency of each value in each feature, shape `(n_features, max_bin)`.
pub fn site_frequencies(x: ArrayView2<usize>, max_bin: usize, pseudocounts: f64) -> Result<Array2<f64>> {
    check_bins(x, max_bin)?;
    let (n_samples, n_features) = x.dim();
    if n_samples == 0 {
        return Err(EfcError::validation(
            "cannot estimate frequencies from an empty training subset",
        ));
    }

    let mut sitefreq = Array2::<f64>::zeros((n_features, max_bin));
    for row in x.rows() {
        for (i, &a) in row.iter().enumerate() {
            sitefreq[(i, a)] += 1.0;
        }
    }

    let n = n_samples as f64;
    let prior = pseudocounts / max_bin as f64;
    sitefreq.mapv_inplace(|count| (1.0 - pseudocounts) * count / n + prior);
    Ok(sitefreq)
}

/// Smoothed co-occurrence frequency of every pair of (feature, value),
/// shape `(n_features, max_bin, n_features, max_bin)`.
///
/// Blocks with `i == j` are diagonal and carry the site frequencies.
pub fn pair_frequencies(
    x: ArrayView2<usize>,
    sitefreq: &Array2<f64>,
    max_bin: usize,
    pseudocounts: f64,
) -> Result<Array4<f64>> {
    check_bins(x, max_bin)?;
    let (n_samples, n_features) = x.dim();
    if n_samples == 0 {
        return Err(EfcError::validation(
            "cannot estimate frequencies from an empty training subset",
        ));
    }
    if sitefreq.dim() != (n_features, max_bin) {
        return Err(EfcError::validation(format!(
            "site frequencies have shape {:?}, expected ({}, {})",
            sitefreq.dim(),
            n_features,
            max_bin
        )));
    }

    let mut pairfreq = Array4::<f64>::zeros((n_features, max_bin, n_features, max_bin));
    for row in x.rows() {
        for i in 0..n_features {
            let a = row[i];
            for j in (i + 1)..n_features {
                pairfreq[(i, a, j, row[j])] += 1.0;
            }
        }
    }

    let n = n_samples as f64;
    let prior = pseudocounts / (max_bin * max_bin) as f64;
    for i in 0..n_features {
        for j in (i + 1)..n_features {
            for a in 0..max_bin {
                for b in 0..max_bin {
                    let value = (1.0 - pseudocounts) * pairfreq[(i, a, j, b)] / n + prior;
                    pairfreq[(i, a, j, b)] = value;
                    pairfreq[(j, b, i, a)] = value;
                }
            }
        }
        for a in 0..max_bin {
            pairfreq[(i, a, i, a)] = sitefreq[(i, a)];
        }
    }

    Ok(pairfreq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample() -> ndarray::Array2<usize> {
        array![[0, 1, 2], [1, 1, 0], [2, 0, 0], [0, 1, 1], [0, 0, 2]]
    }

    #[test]
    fn site_rows_sum_to_one() {
        let x = sample();
        for &lambda in &[0.01, 0.5, 0.9] {
            let site = site_frequencies(x.view(), 3, lambda).unwrap();
            for row in site.rows() {
                assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn site_matches_counts_and_prior() {
        let x = sample();
        let site = site_frequencies(x.view(), 3, 0.5).unwrap();
        // feature 0 takes value 0 in 3 of 5 rows
        assert_abs_diff_eq!(site[(0, 0)], 0.5 * 0.6 + 0.5 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn small_pseudocounts_recover_empirical() {
        let x = sample();
        let site = site_frequencies(x.view(), 3, 1e-12).unwrap();
        assert_abs_diff_eq!(site[(0, 0)], 0.6, epsilon = 1e-9);
        assert_abs_diff_eq!(site[(2, 1)], 0.2, epsilon = 1e-9);
    }

    #[test]
    fn large_pseudocounts_approach_uniform() {
        let x = sample();
        let site = site_frequencies(x.view(), 3, 1.0 - 1e-12).unwrap();
        for v in site.iter() {
            assert_abs_diff_eq!(*v, 1.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn pairs_marginalize_to_sites_and_are_symmetric() {
        let x = sample();
        let site = site_frequencies(x.view(), 3, 0.3).unwrap();
        let pair = pair_frequencies(x.view(), &site, 3, 0.3).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                for a in 0..3 {
                    if i != j {
                        let marginal: f64 = (0..3).map(|b| pair[(i, a, j, b)]).sum();
                        assert_abs_diff_eq!(marginal, site[(i, a)], epsilon = 1e-12);
                    }
                    for b in 0..3 {
                        assert_eq!(pair[(i, a, j, b)], pair[(j, b, i, a)]);
                    }
                }
            }
        }
    }

    #[test]
    fn diagonal_blocks_carry_sites() {
        let x = sample();
        let site = site_frequencies(x.view(), 3, 0.5).unwrap();
        let pair = pair_frequencies(x.view(), &site, 3, 0.5).unwrap();
        assert_eq!(pair[(1, 1, 1, 1)], site[(1, 1)]);
        assert_eq!(pair[(1, 0, 1, 1)], 0.0);
    }

    #[test]
    fn rejects_out_of_range_values_and_empty_input() {
        let x = array![[0usize, 3]];
        assert!(matches!(site_frequencies(x.view(), 3, 0.5), Err(EfcError::Validation(_))));
        assert!(site_frequencies(x.view(), 0, 0.5).is_err());
        let empty = ndarray::Array2::<usize>::zeros((0, 2));
        assert!(site_frequencies(empty.view(), 2, 0.5).is_err());
    }
}
