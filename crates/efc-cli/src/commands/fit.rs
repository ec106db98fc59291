//! `efc fit`: train a classifier from a labelled feature table.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use efc_classifiers::io::{read_labeled_csv, save_classifier, CsvReaderConfig};
use efc_classifiers::{ClassLabel, EfcConfig, EnergyClassifier, Target};

/// Everything `efc fit` needs once arguments and config are resolved.
#[derive(Debug, Clone)]
pub struct FitArgs {
    pub train_data: PathBuf,
    pub output_file: PathBuf,
    pub config: EfcConfig,
    pub reader: CsvReaderConfig,
    pub base_class: Option<String>,
}

/// Load classifier hyper-parameters from a JSON file. Missing keys take their defaults.
pub fn load_efc_config<P: AsRef<Path>>(path: P) -> Result<EfcConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: EfcConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    config.validate()?;
    Ok(config)
}

/// Interpret a base class given on the command line against the target's label kind.
pub fn parse_base_class(raw: &str, y: &Target) -> Result<ClassLabel> {
    match y {
        Target::Text(_) => Ok(ClassLabel::from(raw)),
        Target::Int(_) | Target::Float(_) => {
            let value = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0)
                .ok_or_else(|| anyhow!("Base class '{}' is not a valid label for a numeric target", raw))?;
            Ok(ClassLabel::Int(value as i64))
        }
    }
}

/// Fit a classifier on `args.train_data` and write it to `args.output_file`.
pub fn run_fit(args: &FitArgs) -> Result<EnergyClassifier> {
    let data = read_labeled_csv(&args.train_data, &args.reader)?;
    let base_class = args
        .base_class
        .as_deref()
        .map(|raw| parse_base_class(raw, &data.y))
        .transpose()?;

    let mut classifier = EnergyClassifier::new(args.config.clone());
    classifier
        .fit(data.x.view(), &data.y, base_class.as_ref())
        .with_context(|| format!("Failed to fit classifier on {}", args.train_data.display()))?;

    if let Some(classes) = classifier.classes() {
        let names: Vec<String> = classes.iter().map(ToString::to_string).collect();
        log::info!(
            "Fitted {} class model(s) over [{}] using features {:?}",
            classifier.models().map_or(0, |m| m.len()),
            names.join(", "),
            data.feature_names
        );
    }

    save_classifier(&classifier, &args.output_file)?;
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_base_class() {
        let y = Target::Int(vec![0, 1]);
        assert_eq!(parse_base_class("1", &y).unwrap(), ClassLabel::Int(1));
        assert_eq!(parse_base_class("1.0", &y).unwrap(), ClassLabel::Int(1));
        assert!(parse_base_class("normal", &y).is_err());
        assert!(parse_base_class("0.5", &y).is_err());
    }

    #[test]
    fn text_base_class_kept_verbatim() {
        let y = Target::from(vec!["normal", "dos"]);
        assert_eq!(parse_base_class("1", &y).unwrap(), ClassLabel::from("1"));
    }
}
