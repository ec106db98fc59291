use serde::{Deserialize, Serialize};

use crate::error::{EfcError, Result};

/// Hyper-parameters shared by the ensemble and every per-class model.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EfcConfig {
    /// Weight of the uniform prior blended into empirical frequencies, in `(0, 1)`.
    pub pseudocounts: f64,

    /// Quantile of a class's own training energies used as its cutoff, in `(0, 1)`.
    pub cutoff_quantile: f64,

    /// Degree of per-class parallelism. `None` runs class work on the calling
    /// thread, `Some(0)` uses every logical core.
    pub n_jobs: Option<usize>,
}

impl EfcConfig {
    pub fn new(pseudocounts: f64, cutoff_quantile: f64, n_jobs: Option<usize>) -> Self {
        Self {
            pseudocounts,
            cutoff_quantile,
            n_jobs,
        }
    }

    /// Check that both probabilities lie strictly inside the unit interval.
    pub fn validate(&self) -> Result<()> {
        if !(self.pseudocounts > 0.0 && self.pseudocounts < 1.0) {
            return Err(EfcError::validation(format!(
                "pseudocounts must be in the open interval (0, 1), got {}",
                self.pseudocounts
            )));
        }
        if !(self.cutoff_quantile > 0.0 && self.cutoff_quantile < 1.0) {
            return Err(EfcError::validation(format!(
                "cutoff_quantile must be in the open interval (0, 1), got {}",
                self.cutoff_quantile
            )));
        }
        Ok(())
    }

    /// Build the rayon pool that runs per-class fits and scoring.
    ///
    /// `None` when `n_jobs` is unset: class work then runs on the calling thread.
    pub(crate) fn thread_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        let Some(n_jobs) = self.n_jobs else {
            return Ok(None);
        };
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_jobs)
            .thread_name(|idx| format!("efc-worker-{}", idx))
            .build()
            .map(Some)
            .map_err(|e| EfcError::validation(format!("failed to build thread pool: {}", e)))
    }
}

impl Default for EfcConfig {
    fn default() -> Self {
        Self {
            pseudocounts: 0.5,
            cutoff_quantile: 0.95,
            n_jobs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EfcConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_boundaries() {
        for (p, q) in [(0.0, 0.5), (1.0, 0.5), (0.5, 0.0), (0.5, 1.0), (f64::NAN, 0.5)] {
            let cfg = EfcConfig::new(p, q, None);
            assert!(matches!(cfg.validate(), Err(EfcError::Validation(_))), "{:?}", cfg);
        }
    }

    #[test]
    fn pool_size_follows_n_jobs() {
        assert!(EfcConfig::default().thread_pool().unwrap().is_none());
        let cfg = EfcConfig::new(0.5, 0.95, Some(3));
        let pool = cfg.thread_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
