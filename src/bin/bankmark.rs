use anyhow::{Context, Result};
use bankmark_serve::csv_io::{self, CsvBatch};
use bankmark_serve::telemetry::init_tracing;
use bankmark_serve::{BatchPolicy, BatchSummary, Predictor, RawRecord, ServeConfig};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Bank marketing subscription predictions", long_about = None)]
struct Cli {
    /// Configuration file (any format the `config` crate reads)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pipeline artifact, overriding the configuration
    #[arg(long, global = true)]
    pipeline: Option<PathBuf>,
    /// Schema JSON file, overriding the configuration
    #[arg(long, global = true)]
    schema: Option<PathBuf>,
    /// Log filter, overriding the configuration (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict one record given as a JSON object
    Predict {
        /// Inline JSON record
        #[arg(long, conflicts_with = "file")]
        json: Option<String>,
        /// File holding the JSON record; stdin when neither is given
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Predict every row of a CSV file
    Batch {
        /// Input CSV; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output CSV; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Reject the whole batch if any row is invalid
        #[arg(long)]
        strict: bool,
    },
    /// Write the sample CSV
    SampleCsv {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the expected features and their vocabularies as JSON
    Schema,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = ServeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.pipeline {
        config.pipeline_path = path;
    }
    if let Some(path) = cli.schema {
        config.schema_path = Some(path);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config.log_level, config.log_format).context("initialising logging")?;

    let start = || Predictor::from_config(&config).context("starting predictor");

    match cli.command {
        Commands::SampleCsv { output } => {
            write_output(output.as_ref(), csv_io::sample_csv().as_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Predict { json, file } => {
            let text = match (json, file) {
                (Some(json), _) => json,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let record = RawRecord::from_json_str(&text).context("parsing JSON record")?;
            match start()?.predict(&record) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result.to_response())?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    if let Some(validation) = err.as_validation() {
                        println!("{}", serde_json::to_string_pretty(validation)?);
                        return Ok(ExitCode::from(2));
                    }
                    Err(err.into())
                }
            }
        }
        Commands::Batch {
            input,
            output,
            strict,
        } => {
            let predictor = start()?;
            let batch: CsvBatch = match &input {
                Some(path) => csv_io::read_records(
                    File::open(path).with_context(|| format!("opening {}", path.display()))?,
                ),
                None => csv_io::read_records(io::stdin().lock()),
            }
            .context("reading CSV batch")?;

            let policy = if strict {
                BatchPolicy::RejectOnAnyInvalid
            } else {
                BatchPolicy::Partial
            };
            let results = match predictor.predict_batch_with_policy(&batch.records, policy) {
                Ok(results) => results,
                Err(rejected) => {
                    println!("{}", serde_json::to_string_pretty(&rejected)?);
                    return Ok(ExitCode::from(2));
                }
            };

            let mut buf = Vec::new();
            csv_io::write_results(&mut buf, &batch, &results)?;
            write_output(output.as_ref(), &buf)?;

            let summary = BatchSummary::from_results(&results);
            eprintln!("{}", serde_json::to_string(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema => {
            let predictor = start()?;
            println!("{}", serde_json::to_string_pretty(predictor.schema().features())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
