#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use itertools::Itertools;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process;

use exito::batch::{DataError, load_records, save_predictions};
use exito::service::ServiceError;
use exito::{LearnerRecord, PredictionService};

/// Exit status for artifact, configuration and I/O failures.
const EXIT_INTERNAL_ERROR: i32 = 1;
/// Exit status for malformed records or batch files. Matches clap's usage errors.
const EXIT_CLIENT_ERROR: i32 = 2;

#[derive(Args)]
pub struct PredictArgs {
    /// Path to the service manifest (service.toml)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Learner record as inline JSON (an object or an array of objects)
    #[arg(long, value_name = "JSON", conflicts_with = "input", required_unless_present = "input")]
    pub record: Option<String>,

    /// File containing the JSON request body
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct InferArgs {
    /// Path to a TSV file with one learner record per row
    pub records: PathBuf,

    /// Path to the service manifest (service.toml)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Where to write the predictions
    #[arg(long, default_value = "predictions.tsv")]
    pub output: PathBuf,
}

#[derive(Parser)]
#[command(
    name = "exito",
    about = "Learner success prediction from trained artifacts",
    long_about = "Encodes learner records into the trained feature layout and scores them \
                 with the exported feature selector and classifier."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one record, or a JSON array of records
    #[command(about = "Score learner records given as JSON (prints JSON)")]
    Predict(PredictArgs),

    /// Score a TSV batch of records
    #[command(about = "Score a TSV batch of learner records (outputs: predictions.tsv)")]
    Infer(InferArgs),

    /// Show the encoded feature row for one record
    #[command(about = "Print the encoded feature row for one record")]
    Encode {
        /// Path to the service manifest (service.toml)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        /// Learner record as inline JSON
        #[arg(long, value_name = "JSON")]
        record: String,
    },

    /// List the feature columns in trained order
    #[command(about = "Print the feature columns of the loaded schema")]
    Schema {
        /// Path to the service manifest (service.toml)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Display version information
    #[command(about = "Display version information")]
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Predict(args)) => predict(args),
        Some(Commands::Infer(args)) => infer(args),
        Some(Commands::Encode { config, record }) => encode(config, record),
        Some(Commands::Schema { config }) => print_schema(config),
        Some(Commands::Version) => {
            println!("exito {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(exit_code(e.as_ref()));
    }
}

fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    let client_error = err
        .downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_client_error)
        || err
            .downcast_ref::<DataError>()
            .is_some_and(DataError::is_client_error);
    if client_error {
        EXIT_CLIENT_ERROR
    } else {
        EXIT_INTERNAL_ERROR
    }
}

pub fn predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let body = match (args.record, args.input) {
        (Some(record), _) => record,
        (None, Some(path)) => fs::read_to_string(&path)
            .map_err(|e| format!("Could not read '{}': {e}", path.display()))?,
        (None, None) => return Err("Either --record or --input is required".into()),
    };

    let service = PredictionService::load(&args.config)?;

    let response = match serde_json::from_str::<Value>(&body).map_err(ServiceError::InvalidRecord)? {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .map(serde_json::from_value::<LearnerRecord>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(ServiceError::InvalidRecord)?;
            serde_json::to_string_pretty(&service.predict_batch(&records)?)?
        }
        value => {
            let record: LearnerRecord =
                serde_json::from_value(value).map_err(ServiceError::InvalidRecord)?;
            serde_json::to_string_pretty(&service.predict(&record)?)?
        }
    };
    println!("{response}");
    Ok(())
}

pub fn infer(args: InferArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading service from: {}", args.config.display());
    let service = PredictionService::load(&args.config)?;

    println!("Loading records from: {}", args.records.display());
    let batch = load_records(&args.records)?;
    println!("Loaded {} records for prediction", batch.records.len());

    let predictions = service.predict_batch(&batch.records)?;
    save_predictions(&args.output, &batch.sample_ids, &predictions)?;
    println!("Predictions saved to: {}", args.output.display());
    Ok(())
}

fn encode(config: PathBuf, record: String) -> Result<(), Box<dyn std::error::Error>> {
    let service = PredictionService::load(&config)?;
    let record: LearnerRecord =
        serde_json::from_str(&record).map_err(ServiceError::InvalidRecord)?;
    let row = service.encode(&record);
    println!(
        "{}",
        row.iter()
            .map(|(column, value)| format!("{column}\t{value}"))
            .join("\n")
    );
    Ok(())
}

fn print_schema(config: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let service = PredictionService::load(&config)?;
    println!("{}", service.schema().columns().iter().join("\n"));
    Ok(())
}
