//! Input checks and label bookkeeping shared by the models and the ensemble.
//!
//! Feature matrices arrive as `i64` and are validated once into `usize`
//! matrices whose values all fall in `[0, max_bin)`. Targets are typed
//! (binary, multiclass or unsupported) and encoded against a sorted class
//! vocabulary.
use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{EfcError, Result};

/// Sentinel emitted for numeric vocabularies when a sample is rejected by every model.
pub const UNKNOWN_NUMERIC_LABEL: i64 = -1;
/// Sentinel emitted for textual vocabularies.
pub const UNKNOWN_TEXT_LABEL: &str = "unknown";
/// Largest coupling matrix a model may hold, in entries: `(n_features * max_bin)^2`.
/// The pair frequency tensor has the same number of entries.
pub const MAX_COUPLING_ENTRIES: usize = 1 << 26;

/// A single class label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl ClassLabel {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ClassLabel::Int(_))
    }

    /// The "unknown" label matching the kind of the given vocabulary.
    pub fn unknown_for(classes: &[ClassLabel]) -> ClassLabel {
        if classes.iter().all(ClassLabel::is_numeric) {
            ClassLabel::Int(UNKNOWN_NUMERIC_LABEL)
        } else {
            ClassLabel::Text(UNKNOWN_TEXT_LABEL.to_string())
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{}", v),
            ClassLabel::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ClassLabel {
    fn from(value: i64) -> Self {
        ClassLabel::Int(value)
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        ClassLabel::Text(value.to_string())
    }
}

impl From<String> for ClassLabel {
    fn from(value: String) -> Self {
        ClassLabel::Text(value)
    }
}

/// Label vector passed to `fit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Target {
    pub fn len(&self) -> usize {
        match self {
            Target::Int(v) => v.len(),
            Target::Float(v) => v.len(),
            Target::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<i64>> for Target {
    fn from(value: Vec<i64>) -> Self {
        Target::Int(value)
    }
}

impl From<Vec<f64>> for Target {
    fn from(value: Vec<f64>) -> Self {
        Target::Float(value)
    }
}

impl From<Vec<String>> for Target {
    fn from(value: Vec<String>) -> Self {
        Target::Text(value)
    }
}

impl From<Vec<&str>> for Target {
    fn from(value: Vec<&str>) -> Self {
        Target::Text(value.into_iter().map(str::to_string).collect())
    }
}

/// Kind of target seen at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Binary,
    Multiclass,
}

/// A target encoded against its sorted vocabulary.
#[derive(Debug, Clone)]
pub struct LabelEncoding {
    pub target_type: TargetType,
    /// Sorted, de-duplicated labels.
    pub classes: Vec<ClassLabel>,
    /// Index into `classes` for every sample.
    pub codes: Vec<usize>,
}

impl LabelEncoding {
    /// Row indices of the samples labelled with `classes[class_idx]`.
    pub fn rows_of(&self, class_idx: usize) -> Vec<usize> {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(row, &code)| if code == class_idx { Some(row) } else { None })
            .collect()
    }
}

fn float_to_label(value: f64) -> Result<ClassLabel> {
    if !value.is_finite() {
        return Err(EfcError::validation(format!(
            "target contains a non-finite value ({})",
            value
        )));
    }
    if value.fract() != 0.0 || value.abs() >= i64::MAX as f64 {
        return Err(EfcError::validation(
            "unknown label type: continuous targets are not supported",
        ));
    }
    Ok(ClassLabel::Int(value as i64))
}

/// Type the target and encode it against its sorted vocabulary.
///
/// Two or fewer distinct labels make a binary target, more make a multiclass
/// one. Float targets are accepted only when every value is integral.
pub fn encode_target(y: &Target) -> Result<LabelEncoding> {
    if y.is_empty() {
        return Err(EfcError::validation(
            "requires a non-empty target y to be passed",
        ));
    }

    let labels: Vec<ClassLabel> = match y {
        Target::Int(v) => v.iter().map(|&l| ClassLabel::Int(l)).collect(),
        Target::Float(v) => v.iter().map(|&l| float_to_label(l)).collect::<Result<_>>()?,
        Target::Text(v) => v.iter().map(|l| ClassLabel::Text(l.clone())).collect(),
    };

    let classes: Vec<ClassLabel> = labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let codes = labels
        .iter()
        .map(|label| {
            classes
                .binary_search(label)
                .map_err(|_| EfcError::validation(format!("label {} missing from vocabulary", label)))
        })
        .collect::<Result<Vec<_>>>()?;

    let target_type = if classes.len() <= 2 {
        TargetType::Binary
    } else {
        TargetType::Multiclass
    };

    log::trace!(
        "Encoded {} labels into {} classes ({:?})",
        codes.len(),
        classes.len(),
        target_type
    );

    Ok(LabelEncoding {
        target_type,
        classes,
        codes,
    })
}

/// Validate a training matrix and derive `max_bin = max(x) + 1`.
pub fn discretized_training_matrix(x: ArrayView2<i64>) -> Result<(Array2<usize>, usize)> {
    let (n_samples, n_features) = x.dim();
    if n_samples == 0 || n_features == 0 {
        return Err(EfcError::validation(format!(
            "feature matrix must be non-empty, got shape ({}, {})",
            n_samples, n_features
        )));
    }
    if let Some(&negative) = x.iter().find(|&&v| v < 0) {
        return Err(EfcError::validation(format!(
            "feature values must be non-negative discretized bins, found {}",
            negative
        )));
    }
    let max_value = x.iter().copied().max().unwrap_or(0);
    let max_bin = usize::try_from(max_value)
        .ok()
        .and_then(|m| m.checked_add(1))
        .ok_or_else(|| EfcError::validation(format!("feature value {} is too large", max_value)))?;

    check_model_size(n_features, max_bin)?;

    Ok((x.mapv(|v| v as usize), max_bin))
}

/// Reject feature counts and bin ranges whose model tables would not fit in memory.
pub fn check_model_size(n_features: usize, max_bin: usize) -> Result<()> {
    let entries = n_features
        .checked_mul(max_bin)
        .and_then(|full| full.checked_mul(full));
    match entries {
        Some(entries) if entries <= MAX_COUPLING_ENTRIES => Ok(()),
        _ => Err(EfcError::validation(format!(
            "{} features with max_bin {} exceed the model size limit of {} coupling entries; \
             rebin the features to fewer values",
            n_features, max_bin, MAX_COUPLING_ENTRIES
        ))),
    }
}

/// Validate a matrix against a fitted feature count and bin domain.
pub fn discretized_matrix(x: ArrayView2<i64>, n_features: usize, max_bin: usize) -> Result<Array2<usize>> {
    if x.ncols() != n_features {
        return Err(EfcError::validation(format!(
            "the number of features in predict ({}) is different from the number of features in fit ({})",
            x.ncols(),
            n_features
        )));
    }
    if let Some(&bad) = x
        .iter()
        .find(|&&v| v < 0 || v as u64 >= max_bin as u64)
    {
        return Err(EfcError::validation(format!(
            "feature value {} is outside the fitted domain [0, {})",
            bad, max_bin
        )));
    }
    Ok(x.mapv(|v| v as usize))
}

/// Check that a `usize` matrix only holds values below `max_bin`.
pub fn check_bins(x: ArrayView2<usize>, max_bin: usize) -> Result<()> {
    if max_bin == 0 {
        return Err(EfcError::validation("max_bin must be positive"));
    }
    match x.iter().find(|&&v| v >= max_bin) {
        Some(&bad) => Err(EfcError::validation(format!(
            "feature value {} is outside [0, {})",
            bad, max_bin
        ))),
        None => Ok(()),
    }
}
