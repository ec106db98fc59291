//! Coupling matrix from the inverse of the pairwise correlation structure.
//!
//! The last value of every feature (`max_bin - 1`) is the reference state.
//! Correlations over all `max_bin` values are linearly dependent (each block
//! sums to zero along a row), so the correlation matrix only spans the
//! `max_bin - 1` remaining values of each feature. Couplings touching a
//! reference value are zero.
use nalgebra::DMatrix;
use ndarray::{Array2, Array4};

use crate::error::{EfcError, Result};

/// Reciprocal condition numbers below this are treated as singular.
const MIN_RCOND: f64 = f64::EPSILON;

/// Index of `(feature, value)` in the full `(n_features * max_bin)` layout.
#[inline]
pub fn flat_index(feature: usize, value: usize, max_bin: usize) -> usize {
    feature * max_bin + value
}

/// Connected correlation matrix over the non-reference values,
/// `C[(i,a),(j,b)] = f_ij(a,b) - f_i(a) f_j(b)`.
pub fn correlation_matrix(pairfreq: &Array4<f64>, sitefreq: &Array2<f64>, max_bin: usize) -> Result<DMatrix<f64>> {
    let (n_features, n_bins) = sitefreq.dim();
    if n_bins != max_bin || pairfreq.dim() != (n_features, max_bin, n_features, max_bin) {
        return Err(EfcError::validation(format!(
            "frequency tables {:?} / {:?} do not match max_bin {}",
            sitefreq.dim(),
            pairfreq.dim(),
            max_bin
        )));
    }
    let q = max_bin.saturating_sub(1);
    let dim = n_features * q;

    Ok(DMatrix::from_fn(dim, dim, |r, c| {
        let (i, a) = (r / q, r % q);
        let (j, b) = (c / q, c % q);
        pairfreq[(i, a, j, b)] - sitefreq[(i, a)] * sitefreq[(j, b)]
    }))
}

fn norm1(m: &DMatrix<f64>) -> f64 {
    m.column_iter()
        .map(|col| col.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Invert the correlation matrix and return the log-domain couplings `-C^-1`,
/// embedded in the full `(n_features * max_bin)^2` layout.
///
/// # Errors
///
/// `EfcError::Numerical` when the LU factorization hits a zero pivot, when the
/// inverse is not finite, or when the matrix is too ill-conditioned for the
/// inverse to be trusted.
pub fn coupling_matrix(pairfreq: &Array4<f64>, sitefreq: &Array2<f64>, max_bin: usize) -> Result<Array2<f64>> {
    let corr = correlation_matrix(pairfreq, sitefreq, max_bin)?;
    let n_features = sitefreq.nrows();
    let full = n_features * max_bin;
    let mut coupling = Array2::<f64>::zeros((full, full));

    let dim = corr.nrows();
    if dim == 0 {
        log::debug!("Single-bin features: nothing to invert, couplings are zero");
        return Ok(coupling);
    }

    let inverse = corr.clone().lu().try_inverse().ok_or_else(|| {
        EfcError::numerical(format!(
            "correlation matrix ({}x{}) is singular; check for constant features or increase pseudocounts",
            dim, dim
        ))
    })?;

    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(EfcError::numerical(
            "inverse of the correlation matrix contains non-finite values",
        ));
    }

    let rcond = 1.0 / (norm1(&corr) * norm1(&inverse));
    if !(rcond >= MIN_RCOND) {
        return Err(EfcError::numerical(format!(
            "correlation matrix is ill-conditioned (reciprocal condition {:e})",
            rcond
        )));
    }
    log::trace!("Correlation matrix {}x{} inverted, rcond = {:e}", dim, dim, rcond);

    let q = max_bin - 1;
    for r in 0..dim {
        let (i, a) = (r / q, r % q);
        for c in 0..dim {
            let (j, b) = (c / q, c % q);
            coupling[(flat_index(i, a, max_bin), flat_index(j, b, max_bin))] = -inverse[(r, c)];
        }
    }

    Ok(coupling)
}
