use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use efc_classifiers::io::CsvReaderConfig;
use efc_classifiers::{EfcConfig, PredictOptions};
use efc_cli::commands::fit::{load_efc_config, run_fit, FitArgs};
use efc_cli::commands::predict::{run_predict, write_prediction_output, PredictArgs};

fn label_column_arg() -> Arg {
    Arg::new("label_column")
        .long("label-column")
        .help("Name of the column holding the class label")
        .default_value("Label")
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
        .value_hint(ValueHint::Other)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("EFC_LOG", "error,efc=info"))
        .init();

    let matches = Command::new("efc")
        .version(clap::crate_version!())
        .about("Energy-based flow classifier for discretized network flow features")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("fit")
                .about("Fit a classifier on a labelled feature table")
                .arg(
                    Arg::new("train_data")
                        .help("Path to the training table (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("File path that the fitted classifier (JSON) will be written to")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("Path to a JSON file with pseudocounts, cutoff_quantile and n_jobs")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(label_column_arg())
                .arg(
                    Arg::new("base_class")
                        .long("base-class")
                        .help("Class to model when the target is binary. Defaults to the first class in sorted order.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict classes with a fitted classifier")
                .arg(
                    Arg::new("model")
                        .help("Path to the fitted classifier written by `efc fit`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("input")
                        .help("Path to the table to classify (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write predictions (TSV). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("energies")
                        .long("energies")
                        .help("Also write the energy behind each prediction.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("unknown_class")
                        .long("unknown-class")
                        .help("Multiclass only: label a row as unknown when its energy under the winning (lowest-energy) model exceeds that model's cutoff.")
                        .action(ArgAction::SetTrue),
                )
                .arg(label_column_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("fit", sub_m)) => handle_fit(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn reader_config(matches: &ArgMatches) -> CsvReaderConfig {
    let mut reader = CsvReaderConfig::default();
    if let Some(label_column) = matches.get_one::<String>("label_column") {
        reader.label_column = label_column.clone();
    }
    reader
}

fn handle_fit(matches: &ArgMatches) -> Result<()> {
    let train_data: &PathBuf = matches.get_one("train_data").expect("required argument");
    let output_file: &PathBuf = matches.get_one("output_file").expect("required argument");
    log::info!("[EFC::Fit] Training on: {:?}", train_data);

    let config = match matches.get_one::<PathBuf>("config") {
        Some(config_path) => {
            log::info!("[EFC::Fit] Using config: {:?}", config_path);
            load_efc_config(config_path)?
        }
        None => {
            let config = EfcConfig::default();
            let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
            eprintln!("[EFC::Fit] No config provided; using defaults:\n{}", default_json);
            config
        }
    };

    let args = FitArgs {
        train_data: train_data.clone(),
        output_file: output_file.clone(),
        config,
        reader: reader_config(matches),
        base_class: matches.get_one::<String>("base_class").cloned(),
    };

    match run_fit(&args) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Fit failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let model_file: &PathBuf = matches.get_one("model").expect("required argument");
    let input_file: &PathBuf = matches.get_one("input").expect("required argument");
    log::info!("[EFC::Predict] Model {:?} on {:?}", model_file, input_file);

    let args = PredictArgs {
        model_file: model_file.clone(),
        input_file: input_file.clone(),
        output_file: matches.get_one::<PathBuf>("output_file").cloned(),
        options: PredictOptions {
            return_energies: matches.get_flag("energies"),
            unknown_class: matches.get_flag("unknown_class"),
        },
        reader: reader_config(matches),
    };

    match run_predict(&args) {
        Ok(prediction) => write_prediction_output(&prediction, args.output_file.as_deref()),
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
