//! JSON persistence of fitted classifiers.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::classifier::EnergyClassifier;

/// Write a classifier (fitted or not) as JSON.
pub fn save_classifier<P: AsRef<Path>>(classifier: &EnergyClassifier, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create model file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), classifier)
        .with_context(|| format!("Failed to serialize classifier to {}", path.display()))?;
    log::info!("Saved classifier to {}", path.display());
    Ok(())
}

/// Load a classifier written by [`save_classifier`].
pub fn load_classifier<P: AsRef<Path>>(path: P) -> Result<EnergyClassifier> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open model file: {}", path.display()))?;
    let classifier = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse classifier from {}", path.display()))?;
    Ok(classifier)
}
