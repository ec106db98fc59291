//! Reader for headered CSV/TSV tables of discretized features.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::Array2;

use crate::data_handling::Target;

/// Parsed table ready for `fit`.
#[derive(Debug)]
pub struct LabeledData {
    pub x: Array2<i64>,
    pub y: Target,
    pub feature_names: Vec<String>,
}

/// Configuration for reading feature tables.
#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    /// Column holding the class label.
    pub label_column: String,
    /// Field delimiter; `None` picks tab for `.tsv` files and comma otherwise.
    pub delimiter: Option<u8>,
    /// Columns skipped when collecting features (identifiers and the like).
    pub ignore_columns: Vec<String>,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "Label".to_string(),
            delimiter: None,
            ignore_columns: Vec::new(),
        }
    }
}

fn delimiter_for(path: &Path, config: &CsvReaderConfig) -> u8 {
    config.delimiter.unwrap_or_else(|| {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    })
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Turn raw label strings into the narrowest target type that holds them.
fn parse_target(raw: Vec<String>) -> Target {
    if let Ok(ints) = raw.iter().map(|s| s.parse::<i64>()).collect::<Result<Vec<_>, _>>() {
        return Target::Int(ints);
    }
    if let Ok(floats) = raw.iter().map(|s| s.parse::<f64>()).collect::<Result<Vec<_>, _>>() {
        return Target::Float(floats);
    }
    Target::Text(raw)
}

fn read_table<P: AsRef<Path>>(
    path: P,
    config: &CsvReaderConfig,
    require_label: bool,
) -> Result<(Array2<i64>, Option<Vec<String>>, Vec<String>)> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path, config))
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open feature table: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();

    let label_idx = find_column(&headers, &config.label_column);
    if require_label && label_idx.is_none() {
        return Err(anyhow!("Missing label column '{}'", config.label_column));
    }

    let feature_indices: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            Some(*idx) != label_idx && !config.ignore_columns.iter().any(|c| c == name.trim())
        })
        .map(|(idx, _)| idx)
        .collect();
    if feature_indices.is_empty() {
        return Err(anyhow!("No feature columns detected in {}", path.display()));
    }
    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers[idx].trim().to_string())
        .collect::<Vec<_>>();

    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut n_rows = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        for &idx in &feature_indices {
            let field = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing value in column {} at row {}", idx, row_idx + 1))?;
            let value = field.trim().parse::<i64>().with_context(|| {
                format!(
                    "Non-integer feature value '{}' in column '{}' at row {}",
                    field,
                    headers[idx].trim(),
                    row_idx + 1
                )
            })?;
            values.push(value);
        }
        if let Some(idx) = label_idx {
            let label = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing label value at row {}", row_idx + 1))?;
            labels.push(label.trim().to_string());
        }
        n_rows += 1;
    }

    let x = Array2::from_shape_vec((n_rows, feature_indices.len()), values)
        .context("Feature table is not rectangular")?;
    log::info!(
        "Read {} rows x {} features from {}",
        n_rows,
        feature_names.len(),
        path.display()
    );

    Ok((x, label_idx.map(|_| labels), feature_names))
}

/// Read a table whose label column holds the class of every row.
pub fn read_labeled_csv<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<LabeledData> {
    let (x, labels, feature_names) = read_table(path, config, true)?;
    let labels = labels.ok_or_else(|| anyhow!("Missing label column '{}'", config.label_column))?;
    Ok(LabeledData {
        x,
        y: parse_target(labels),
        feature_names,
    })
}

/// Read only the feature columns of a table; a label column, if present, is skipped.
pub fn read_feature_csv<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<(Array2<i64>, Vec<String>)> {
    let (x, _, feature_names) = read_table(path, config, false)?;
    Ok((x, feature_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_features_and_text_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "flows.csv", "proto,Label,bytes\n0,normal,3\n1,dos,0\n");
        let data = read_labeled_csv(&path, &CsvReaderConfig::default()).unwrap();
        assert_eq!(data.feature_names, vec!["proto", "bytes"]);
        assert_eq!(data.x, ndarray::array![[0i64, 3], [1, 0]]);
        assert_eq!(data.y, Target::from(vec!["normal", "dos"]));
    }

    #[test]
    fn numeric_labels_and_tsv_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "flows.tsv", "a\tb\tLabel\n0\t1\t1\n1\t1\t0\n");
        let data = read_labeled_csv(&path, &CsvReaderConfig::default()).unwrap();
        assert_eq!(data.y, Target::Int(vec![1, 0]));
        assert_eq!(data.x.dim(), (2, 2));
    }

    #[test]
    fn fractional_labels_stay_float() {
        assert_eq!(
            parse_target(vec!["0.5".to_string(), "1".to_string()]),
            Target::Float(vec![0.5, 1.0])
        );
    }

    #[test]
    fn missing_label_column_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "flows.csv", "a,b\n0,1\n");
        assert!(read_labeled_csv(&path, &CsvReaderConfig::default()).is_err());
        let (x, names) = read_feature_csv(&path, &CsvReaderConfig::default()).unwrap();
        assert_eq!(x.dim(), (1, 2));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn ignored_columns_and_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "flows.csv", "FlowId,a,Label\nx1,0,1\nx2,2.5,0\n");
        let config = CsvReaderConfig {
            ignore_columns: vec!["FlowId".to_string()],
            ..CsvReaderConfig::default()
        };
        let err = read_labeled_csv(&path, &config).unwrap_err();
        assert!(format!("{:#}", err).contains("Non-integer feature value"));
    }
}
