use std::time::Instant;

use ndarray::{Array1, Array2, Array4, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::EfcConfig;
use crate::data_handling::check_model_size;
use crate::error::{EfcError, Result};
use crate::models::coupling::coupling_matrix;
use crate::models::energy::compute_energies;
use crate::models::fields::local_fields;
use crate::models::frequencies::{pair_frequencies, site_frequencies};
use crate::stats::energy_cutoff;

/// Energy model fitted on the samples of a single class.
///
/// Built in one pass by [`EnergyModel::fit`]: frequencies, couplings, local
/// fields and the cutoff are computed locally and the value only exists once
/// every stage has succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyModel {
    max_bin: usize,
    pseudocounts: f64,
    cutoff_quantile: f64,
    sitefreq: Array2<f64>,
    pairfreq: Array4<f64>,
    coupling: Array2<f64>,
    fields: Array1<f64>,
    cutoff: f64,
}

impl EnergyModel {
    /// Fit a model on one class's samples.
    ///
    /// # Arguments
    ///
    /// * `x` - Training samples of the class, values in `[0, max_bin)`.
    /// * `max_bin` - Number of bins shared by every feature.
    /// * `config` - Pseudocounts and cutoff quantile.
    ///
    /// # Errors
    ///
    /// Validation errors for empty or out-of-domain input, numerical errors
    /// when the correlation matrix cannot be inverted.
    pub fn fit(x: ArrayView2<usize>, max_bin: usize, config: &EfcConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();
        let (n_samples, n_features) = x.dim();
        check_model_size(n_features, max_bin)?;

        let sitefreq = site_frequencies(x, max_bin, config.pseudocounts)?;
        let pairfreq = pair_frequencies(x, &sitefreq, max_bin, config.pseudocounts)?;
        log::debug!(
            "Frequencies for {} samples x {} features (max_bin {}) in {:?}",
            n_samples,
            n_features,
            max_bin,
            start.elapsed()
        );

        let coupling = coupling_matrix(&pairfreq, &sitefreq, max_bin)?;
        let fields = local_fields(&coupling, &sitefreq, max_bin)?;
        log::debug!(
            "Coupling matrix {:?} and local fields ready after {:?}",
            coupling.dim(),
            start.elapsed()
        );

        let energies = compute_energies(&coupling, &fields, max_bin, x)?;
        let cutoff = energy_cutoff(&energies, config.cutoff_quantile)
            .ok_or_else(|| EfcError::validation("cannot define a cutoff without training samples"))?;
        log::debug!(
            "Cutoff {:.6} at quantile {} of {} training energies",
            cutoff,
            config.cutoff_quantile,
            n_samples
        );

        Ok(EnergyModel {
            max_bin,
            pseudocounts: config.pseudocounts,
            cutoff_quantile: config.cutoff_quantile,
            sitefreq,
            pairfreq,
            coupling,
            fields,
            cutoff,
        })
    }

    /// Energies of the rows of `x` under this model.
    pub fn energies(&self, x: ArrayView2<usize>) -> Result<Array1<f64>> {
        compute_energies(&self.coupling, &self.fields, self.max_bin, x)
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn cutoff_quantile(&self) -> f64 {
        self.cutoff_quantile
    }

    pub fn pseudocounts(&self) -> f64 {
        self.pseudocounts
    }

    pub fn max_bin(&self) -> usize {
        self.max_bin
    }

    pub fn n_features(&self) -> usize {
        self.sitefreq.nrows()
    }

    /// Smoothed site frequencies, shape `(n_features, max_bin)`.
    pub fn site_frequencies(&self) -> &Array2<f64> {
        &self.sitefreq
    }

    /// Smoothed pair frequencies, shape `(n_features, max_bin, n_features, max_bin)`.
    pub fn pair_frequencies(&self) -> &Array4<f64> {
        &self.pairfreq
    }

    /// Log-domain couplings, indexed by `feature * max_bin + value`.
    pub fn coupling_matrix(&self) -> &Array2<f64> {
        &self.coupling
    }

    /// Log-domain local fields, indexed by `feature * max_bin + value`.
    pub fn local_fields(&self) -> &Array1<f64> {
        &self.fields
    }
}
