//! File IO: labeled CSV feature tables and fitted classifier persistence.
pub mod labeled_csv;
pub mod model_json;

pub use labeled_csv::{read_feature_csv, read_labeled_csv, LabeledData, CsvReaderConfig};
pub use model_json::{load_classifier, save_classifier};
