//! `efc predict`: label the rows of a feature table with a saved classifier.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use efc_classifiers::io::{load_classifier, read_feature_csv, CsvReaderConfig};
use efc_classifiers::{PredictOptions, Prediction};

#[derive(Debug, Clone)]
pub struct PredictArgs {
    pub model_file: PathBuf,
    pub input_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub options: PredictOptions,
    pub reader: CsvReaderConfig,
}

/// Load the model, read the input table and predict every row.
pub fn run_predict(args: &PredictArgs) -> Result<Prediction> {
    let classifier = load_classifier(&args.model_file)?;
    let (x, _) = read_feature_csv(&args.input_file, &args.reader)?;
    let prediction = classifier
        .predict(x.view(), args.options)
        .with_context(|| format!("Failed to predict {}", args.input_file.display()))?;
    log::info!("Predicted {} rows", prediction.labels.len());
    Ok(prediction)
}

/// Write predictions as TSV: a `prediction` column, plus `energy` when energies were requested.
pub fn write_predictions<W: Write>(writer: W, prediction: &Prediction) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    match &prediction.energies {
        Some(energies) => {
            wtr.write_record(["prediction", "energy"])?;
            for (label, energy) in prediction.labels.iter().zip(energies.iter()) {
                wtr.write_record([label.to_string(), energy.to_string()])?;
            }
        }
        None => {
            wtr.write_record(["prediction"])?;
            for label in &prediction.labels {
                wtr.write_record([label.to_string()])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write predictions to `output_path`, or to stdout when no path is given.
pub fn write_prediction_output(prediction: &Prediction, output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_predictions(BufWriter::new(file), prediction)?;
            log::info!("Wrote predictions to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            write_predictions(stdout.lock(), prediction)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use efc_classifiers::ClassLabel;

    #[test]
    fn labels_only() {
        let prediction = Prediction {
            labels: vec![ClassLabel::Int(0), ClassLabel::Int(-1)],
            energies: None,
        };
        let mut buf = Vec::new();
        write_predictions(&mut buf, &prediction).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "prediction\n0\n-1\n");
    }

    #[test]
    fn labels_with_energies() {
        let prediction = Prediction {
            labels: vec![ClassLabel::from("dos")],
            energies: Some(ndarray::array![-1.5]),
        };
        let mut buf = Vec::new();
        write_predictions(&mut buf, &prediction).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "prediction\tenergy\ndos\t-1.5\n");
    }
}
