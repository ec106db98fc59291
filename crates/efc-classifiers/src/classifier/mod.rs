//! The energy-based flow classifier: one energy model per class.
//!
//! For a binary target a single model is fit on the base class and samples are
//! accepted into it when their energy falls below its cutoff. For a multiclass
//! target every class gets its own model and a sample goes to the class with
//! the lowest energy, optionally flagged as unknown when even the winner
//! rejects it.
pub mod decision;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use crate::config::EfcConfig;
use crate::data_handling::{
    discretized_matrix, discretized_training_matrix, encode_target, ClassLabel, Target, TargetType,
};
use crate::error::{EfcError, Result};
use crate::models::EnergyModel;

pub use decision::{binary_decision, multiclass_decision, Decision};

/// Switches for [`EnergyClassifier::predict`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictOptions {
    /// Also return the energy that drove each decision.
    pub return_energies: bool,
    /// Multiclass only: label samples rejected by the winning model as unknown.
    pub unknown_class: bool,
}

/// Labels predicted for a matrix of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub labels: Vec<ClassLabel>,
    /// Binary: the base model's energy. Multiclass: the minimum energy.
    pub energies: Option<Array1<f64>>,
}

/// Everything learned by a successful `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredState")]
struct FittedState {
    target_type: TargetType,
    classes: Vec<ClassLabel>,
    /// Binary targets only.
    base_class_idx: Option<usize>,
    max_bin: usize,
    n_features: usize,
    models: Vec<EnergyModel>,
}

/// Fitted state as read back from disk, before its consistency is checked.
#[derive(Deserialize)]
struct StoredState {
    target_type: TargetType,
    classes: Vec<ClassLabel>,
    base_class_idx: Option<usize>,
    max_bin: usize,
    n_features: usize,
    models: Vec<EnergyModel>,
}

impl TryFrom<StoredState> for FittedState {
    type Error = EfcError;

    fn try_from(stored: StoredState) -> Result<Self> {
        let n_classes = stored.classes.len();
        if n_classes == 0 {
            return Err(EfcError::validation("fitted state has no classes"));
        }
        if stored.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EfcError::validation(
                "fitted classes are not sorted and unique",
            ));
        }
        match stored.target_type {
            TargetType::Binary => {
                if n_classes > 2 || stored.models.len() != 1 {
                    return Err(EfcError::validation(format!(
                        "binary fit needs at most 2 classes and 1 model, found {} and {}",
                        n_classes,
                        stored.models.len()
                    )));
                }
                match stored.base_class_idx {
                    Some(idx) if idx < n_classes => {}
                    other => {
                        return Err(EfcError::validation(format!(
                            "base class index {:?} is out of range for {} classes",
                            other, n_classes
                        )))
                    }
                }
            }
            TargetType::Multiclass => {
                if n_classes < 3 || stored.models.len() != n_classes || stored.base_class_idx.is_some() {
                    return Err(EfcError::validation(format!(
                        "multiclass fit needs one model per class (3 or more), found {} classes and {} models",
                        n_classes,
                        stored.models.len()
                    )));
                }
            }
        }
        if let Some(model) = stored
            .models
            .iter()
            .find(|m| m.max_bin() != stored.max_bin || m.n_features() != stored.n_features)
        {
            return Err(EfcError::validation(format!(
                "model with {} features and max_bin {} does not match the fitted {} features and max_bin {}",
                model.n_features(),
                model.max_bin(),
                stored.n_features,
                stored.max_bin
            )));
        }

        Ok(FittedState {
            target_type: stored.target_type,
            classes: stored.classes,
            base_class_idx: stored.base_class_idx,
            max_bin: stored.max_bin,
            n_features: stored.n_features,
            models: stored.models,
        })
    }
}

/// Energy-based flow classifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyClassifier {
    config: EfcConfig,
    fitted: Option<FittedState>,
}

fn fit_class(x: &Array2<usize>, rows: &[usize], max_bin: usize, config: &EfcConfig) -> Result<EnergyModel> {
    let subset = x.select(Axis(0), rows);
    EnergyModel::fit(subset.view(), max_bin, config)
}

/// Run `op` for every class index, in parallel on `pool` when one was
/// configured. Results keep class order.
fn map_classes<T, F>(pool: Option<&ThreadPool>, n_classes: usize, op: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    match pool {
        Some(pool) => pool.install(|| (0..n_classes).into_par_iter().map(&op).collect()),
        None => (0..n_classes).map(op).collect(),
    }
}

impl EnergyClassifier {
    pub fn new(config: EfcConfig) -> Self {
        EnergyClassifier { config, fitted: None }
    }

    pub fn config(&self) -> &EfcConfig {
        &self.config
    }

    /// Fit the classifier.
    ///
    /// Any previous fit is discarded first, so a failed fit leaves the
    /// classifier unfitted.
    ///
    /// # Arguments
    ///
    /// * `x` - Discretized samples, shape `(n_samples, n_features)`; `max_bin` is `max(x) + 1`.
    /// * `y` - One label per sample.
    /// * `base_class` - Binary targets only: the class to model. Defaults to the
    ///   first class in sorted order.
    ///
    /// # Errors
    ///
    /// `EfcError::Validation` for inconsistent input, unsupported targets or an
    /// unknown base class; `EfcError::Numerical` naming the class whose
    /// correlation matrix could not be inverted.
    pub fn fit(&mut self, x: ArrayView2<i64>, y: &Target, base_class: Option<&ClassLabel>) -> Result<&mut Self> {
        self.fitted = None;
        self.config.validate()?;

        if y.len() != x.nrows() {
            return Err(EfcError::validation(format!(
                "found input variables with inconsistent numbers of samples: x has {}, y has {}",
                x.nrows(),
                y.len()
            )));
        }
        let (x, max_bin) = discretized_training_matrix(x)?;
        let encoding = encode_target(y)?;
        let classes = encoding.classes.clone();
        let pool = self.config.thread_pool()?;

        log::info!(
            "Fitting {:?} energy classifier on {} samples x {} features, {} classes, max_bin {}",
            encoding.target_type,
            x.nrows(),
            x.ncols(),
            classes.len(),
            max_bin
        );

        let (models, base_class_idx) = match encoding.target_type {
            TargetType::Binary => {
                let base_idx = match base_class {
                    None => 0,
                    Some(label) => classes.iter().position(|c| c == label).ok_or_else(|| {
                        EfcError::validation(format!("base class {} not in target classes", label))
                    })?,
                };
                let rows = encoding.rows_of(base_idx);
                log::debug!("Base class {} with {} training samples", classes[base_idx], rows.len());
                let config = &self.config;
                let fit_base = || fit_class(&x, &rows, max_bin, config);
                let model = match &pool {
                    Some(pool) => pool.install(fit_base),
                    None => fit_base(),
                }
                .map_err(|e| e.for_class(&classes[base_idx]))?;
                (vec![model], Some(base_idx))
            }
            TargetType::Multiclass => {
                if let Some(label) = base_class {
                    log::warn!("base class {} is ignored for multiclass targets", label);
                }
                let config = &self.config;
                let results: Vec<Result<EnergyModel>> = map_classes(pool.as_ref(), classes.len(), |idx| {
                    fit_class(&x, &encoding.rows_of(idx), max_bin, config)
                });
                let models = results
                    .into_iter()
                    .enumerate()
                    .map(|(idx, result)| result.map_err(|e| e.for_class(&classes[idx])))
                    .collect::<Result<Vec<_>>>()?;
                (models, None)
            }
        };

        for (label, model) in classes.iter().zip(models.iter()) {
            log::debug!("Class {} cutoff {:.6}", label, model.cutoff());
        }

        self.fitted = Some(FittedState {
            target_type: encoding.target_type,
            classes,
            base_class_idx,
            max_bin,
            n_features: x.ncols(),
            models,
        });
        Ok(self)
    }

    /// Classify the samples in `x`.
    ///
    /// For a binary fit, samples below the cutoff get the base class and the
    /// rest get the other class. When the target held a single class there is
    /// no other class, and rejected samples get the unknown sentinel (`-1` for
    /// numeric labels, `"unknown"` otherwise) instead of the base class.
    ///
    /// # Errors
    ///
    /// `EfcError::NotFitted` before `fit`; `EfcError::Validation` when the
    /// feature count differs from fit or a value lies outside `[0, max_bin)`.
    pub fn predict(&self, x: ArrayView2<i64>, options: PredictOptions) -> Result<Prediction> {
        let fitted = self.fitted.as_ref().ok_or(EfcError::NotFitted)?;
        let x = discretized_matrix(x, fitted.n_features, fitted.max_bin)?;
        let pool = self.config.thread_pool()?;

        let energies: Vec<Array1<f64>> = map_classes(pool.as_ref(), fitted.models.len(), |idx| {
            fitted.models[idx].energies(x.view())
        })
        .into_iter()
        .collect::<Result<_>>()?;

        let (labels, selected) = match fitted.target_type {
            TargetType::Binary => {
                let base_idx = fitted.base_class_idx.unwrap_or(0);
                let base = &fitted.classes[base_idx];
                let other = fitted
                    .classes
                    .iter()
                    .enumerate()
                    .find(|&(idx, _)| idx != base_idx)
                    .map(|(_, label)| label.clone())
                    .unwrap_or_else(|| ClassLabel::unknown_for(&fitted.classes));
                let cutoff = fitted.models[0].cutoff();
                let labels: Vec<ClassLabel> = binary_decision(&energies[0], cutoff)
                    .into_iter()
                    .map(|is_base| if is_base { base.clone() } else { other.clone() })
                    .collect();
                (labels, energies.into_iter().next().unwrap_or_default())
            }
            TargetType::Multiclass => {
                let cutoffs: Vec<f64> = fitted.models.iter().map(EnergyModel::cutoff).collect();
                let (decisions, winning) = multiclass_decision(&energies, &cutoffs, options.unknown_class)?;
                let unknown = ClassLabel::unknown_for(&fitted.classes);
                let labels: Vec<ClassLabel> = decisions
                    .into_iter()
                    .map(|d| match d {
                        Decision::Class(idx) => fitted.classes[idx].clone(),
                        Decision::Unknown => unknown.clone(),
                    })
                    .collect();
                (labels, winning)
            }
        };

        log::debug!("Predicted {} samples", x.nrows());

        Ok(Prediction {
            labels,
            energies: options.return_energies.then_some(selected),
        })
    }

    /// Convenience wrapper returning only the labels.
    pub fn predict_labels(&self, x: ArrayView2<i64>) -> Result<Vec<ClassLabel>> {
        Ok(self.predict(x, PredictOptions::default())?.labels)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Sorted class vocabulary seen at fit.
    pub fn classes(&self) -> Option<&[ClassLabel]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    pub fn target_type(&self) -> Option<TargetType> {
        self.fitted.as_ref().map(|f| f.target_type)
    }

    /// The modelled class of a binary fit.
    pub fn base_class(&self) -> Option<&ClassLabel> {
        let fitted = self.fitted.as_ref()?;
        fitted.base_class_idx.map(|idx| &fitted.classes[idx])
    }

    pub fn max_bin(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.max_bin)
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    /// Fitted per-class models, in class order (a single model for binary targets).
    pub fn models(&self) -> Option<&[EnergyModel]> {
        self.fitted.as_ref().map(|f| f.models.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fresh_classifier_is_not_fitted() {
        let clf = EnergyClassifier::default();
        assert!(!clf.is_fitted());
        assert_eq!(
            clf.predict(array![[0i64, 1]].view(), PredictOptions::default()),
            Err(EfcError::NotFitted)
        );
    }

    #[test]
    fn length_mismatch_is_rejected_before_fitting() {
        let mut clf = EnergyClassifier::default();
        let err = clf
            .fit(array![[0i64, 1], [1, 0]].view(), &Target::from(vec![0i64]), None)
            .unwrap_err();
        assert!(matches!(err, EfcError::Validation(_)));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn unknown_base_class_is_rejected() {
        let mut clf = EnergyClassifier::default();
        let err = clf
            .fit(
                array![[0i64, 1], [1, 0]].view(),
                &Target::from(vec![0i64, 1]),
                Some(&ClassLabel::Int(7)),
            )
            .unwrap_err();
        assert!(matches!(err, EfcError::Validation(msg) if msg.contains("base class")));
    }
}
