//! Integration tests for config loading and the fit/predict command helpers.

use std::io::Write;

use efc_classifiers::io::CsvReaderConfig;
use efc_classifiers::{ClassLabel, EfcConfig, PredictOptions};
use efc_cli::commands::fit::{load_efc_config, run_fit, FitArgs};
use efc_cli::commands::predict::{run_predict, write_predictions, PredictArgs};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Three classes of flows over two features, each mostly `(c, c)`.
fn multiclass_csv() -> String {
    let mut csv = String::from("Label,a,b\n");
    for c in 0..3 {
        for _ in 0..16 {
            csv.push_str(&format!("{},{},{}\n", c, c, c));
        }
        for _ in 0..2 {
            csv.push_str(&format!("{},{},3\n{},3,{}\n", c, c, c, c));
        }
    }
    csv
}

// ---------------------------------------------------------------------------
// EfcConfig loading
// ---------------------------------------------------------------------------

#[test]
fn config_missing_keys_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "config.json", r#"{"n_jobs": 2}"#);
    let cfg = load_efc_config(&path).unwrap();
    assert_eq!(cfg, EfcConfig::new(0.5, 0.95, Some(2)));
}

#[test]
fn config_round_trips_through_json() {
    let cfg = EfcConfig::new(0.3, 0.9, Some(4));
    let json = serde_json::to_string_pretty(&cfg).unwrap();
    assert!(json.contains("pseudocounts"));
    assert!(json.contains("cutoff_quantile"));
    let back: EfcConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn config_out_of_range_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "config.json", r#"{"cutoff_quantile": 0.0}"#);
    let err = load_efc_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("cutoff_quantile"));
}

#[test]
fn config_nonexistent_file_errors() {
    assert!(load_efc_config("/nonexistent/config.json").is_err());
}

// ---------------------------------------------------------------------------
// run_fit / run_predict
// ---------------------------------------------------------------------------

#[test]
fn multiclass_fit_and_predict_with_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_file(&dir, "train.csv", &multiclass_csv());
    let model = dir.path().join("model.json");

    let classifier = run_fit(&FitArgs {
        train_data: train,
        output_file: model.clone(),
        config: EfcConfig::new(0.5, 0.95, Some(2)),
        reader: CsvReaderConfig::default(),
        base_class: None,
    })
    .unwrap();
    assert_eq!(classifier.classes().unwrap().len(), 3);
    assert!(model.exists());

    let input = write_file(&dir, "flows.csv", "a,b\n2,2\n3,3\n");
    let prediction = run_predict(&PredictArgs {
        model_file: model,
        input_file: input,
        output_file: None,
        options: PredictOptions {
            return_energies: false,
            unknown_class: true,
        },
        reader: CsvReaderConfig::default(),
    })
    .unwrap();
    assert_eq!(prediction.labels, vec![ClassLabel::Int(2), ClassLabel::Int(-1)]);

    let mut buf = Vec::new();
    write_predictions(&mut buf, &prediction).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "prediction\n2\n-1\n");
}

#[test]
fn unknown_base_class_fails_fit() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_file(&dir, "train.csv", "a,Label\n0,x\n1,y\n");
    let result = run_fit(&FitArgs {
        train_data: train,
        output_file: dir.path().join("model.json"),
        config: EfcConfig::default(),
        reader: CsvReaderConfig::default(),
        base_class: Some("z".to_string()),
    });
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("base class z"));
    assert!(!dir.path().join("model.json").exists());
}

#[test]
fn custom_label_column() {
    let dir = tempfile::tempdir().unwrap();
    let train = write_file(&dir, "train.csv", "a,b,class\n0,0,1\n0,1,1\n1,0,1\n1,1,2\n");
    let reader = CsvReaderConfig {
        label_column: "class".to_string(),
        ..Default::default()
    };
    let classifier = run_fit(&FitArgs {
        train_data: train,
        output_file: dir.path().join("model.json"),
        config: EfcConfig::default(),
        reader,
        base_class: Some("2".to_string()),
    })
    .unwrap();
    assert_eq!(classifier.base_class(), Some(&ClassLabel::Int(2)));
}
