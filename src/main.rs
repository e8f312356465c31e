use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use emsdispatch::application::engine::DispatchEngine;
use emsdispatch::config::{DEFAULT_LOG_FILTER, DEFAULT_OPERATOR, DispatchConfig};
use emsdispatch::domain::call::{CallFilter, CallStatus};
use emsdispatch::domain::payload::AmbulanceForm;
use emsdispatch::domain::ports::Stores;
use emsdispatch::domain::update::TimeRange;
use emsdispatch::infrastructure::in_memory::in_memory_stores;
use emsdispatch::interfaces::csv::call_writer::CallWriter;
use emsdispatch::interfaces::csv::record_reader::RecordReader;
use emsdispatch::interfaces::csv::rows::{AmbulanceRow, LocationRow, UpdateRow};
use emsdispatch::interfaces::csv::update_writer::UpdateWriter;
use emsdispatch::interfaces::json::call_reader::CallReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "EMSDISPATCH_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Name recorded as the author of every change
    #[arg(long, global = true, env = "EMSDISPATCH_OPERATOR", default_value = DEFAULT_OPERATOR)]
    operator: String,

    /// Log filter; RUST_LOG takes precedence when set
    #[arg(long, global = true, env = "EMSDISPATCH_LOG", default_value = DEFAULT_LOG_FILTER)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

/// Files loaded before the command runs, in this order.
#[derive(Args)]
struct Inputs {
    /// Locations CSV (hospitals, bases, ...)
    #[arg(long)]
    locations: Option<PathBuf>,

    /// Ambulances CSV
    #[arg(long)]
    ambulances: Option<PathBuf>,

    /// Calls JSON (one call or an array of calls)
    #[arg(long)]
    calls: Option<PathBuf>,

    /// Ambulance updates CSV
    #[arg(long)]
    updates: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the call board
    Calls {
        #[command(flatten)]
        inputs: Inputs,

        /// Only calls assigned to these ambulances (identifiers)
        #[arg(long)]
        ambulance: Vec<String>,

        /// Only calls in this status (P, S or E)
        #[arg(long)]
        status: Option<CallStatus>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
    /// Print the status/location history of an ambulance
    History {
        /// Ambulance identifier
        identifier: String,

        #[command(flatten)]
        inputs: Inputs,

        /// Only updates made while this call was active
        #[arg(long, conflicts_with_all = ["since", "until"])]
        call: Option<u32>,

        #[arg(long)]
        since: Option<DateTime<Utc>>,

        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DispatchConfig::new(cli.db_path, cli.operator, cli.log).into_diagnostic()?;
    init_tracing(&config)?;

    let engine = DispatchEngine::new(open_stores(&config)?);

    match cli.command {
        Command::Calls {
            inputs,
            ambulance,
            status,
            format,
        } => {
            load(&engine, &inputs, config.operator()).await?;

            let ambulances = if ambulance.is_empty() {
                None
            } else {
                let mut ids = Vec::with_capacity(ambulance.len());
                for identifier in &ambulance {
                    ids.push(
                        engine
                            .ambulance_by_identifier(identifier)
                            .await
                            .into_diagnostic()?
                            .id,
                    );
                }
                Some(ids)
            };
            let calls = engine
                .calls(&CallFilter { ambulances, status })
                .await
                .into_diagnostic()?;

            let stdout = io::stdout();
            match format {
                OutputFormat::Csv => {
                    let mut writer = CallWriter::new(stdout.lock());
                    writer.write_calls(&calls).into_diagnostic()?;
                }
                OutputFormat::Json => {
                    let mut out = stdout.lock();
                    serde_json::to_writer_pretty(&mut out, &calls).into_diagnostic()?;
                    writeln!(out).into_diagnostic()?;
                }
            }
        }
        Command::History {
            identifier,
            inputs,
            call,
            since,
            until,
        } => {
            load(&engine, &inputs, config.operator()).await?;

            let ambulance = engine
                .ambulance_by_identifier(&identifier)
                .await
                .into_diagnostic()?;
            let updates = match call {
                Some(call_id) => engine.ambulance_updates_for_call(ambulance.id, call_id).await,
                None => {
                    let range = TimeRange::new(since, until).into_diagnostic()?;
                    engine.ambulance_history(ambulance.id, range).await
                }
            }
            .into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = UpdateWriter::new(stdout.lock());
            writer.write_updates(&updates).into_diagnostic()?;
        }
    }

    Ok(())
}

fn init_tracing(config: &DispatchConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_filter()).into_diagnostic()?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init()
        .into_diagnostic()?;
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(config: &DispatchConfig) -> Result<Stores> {
    use emsdispatch::infrastructure::rocksdb::RocksDBStore;

    match config.db_path() {
        Some(path) => {
            info!("Using persistent storage at {}", path.display());
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(store.into_stores())
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(config: &DispatchConfig) -> Result<Stores> {
    if config.db_path().is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

/// Feeds the input files to the engine. Bad records are reported and skipped.
async fn load(engine: &DispatchEngine, inputs: &Inputs, operator: &str) -> Result<()> {
    if let Some(path) = &inputs.locations {
        let reader = RecordReader::new(File::open(path).into_diagnostic()?);
        for row in reader.records::<LocationRow>() {
            match row.and_then(LocationRow::into_payload) {
                Ok(payload) => {
                    if let Err(e) = engine.register_location(payload, operator).await {
                        error!("Error processing location: {}", e);
                    }
                }
                Err(e) => error!("Error reading location: {}", e),
            }
        }
    }

    if let Some(path) = &inputs.ambulances {
        let reader = RecordReader::new(File::open(path).into_diagnostic()?);
        for row in reader.records::<AmbulanceRow>() {
            match row {
                Ok(row) => {
                    if let Err(e) = engine
                        .register_ambulance(AmbulanceForm::from(row), operator)
                        .await
                    {
                        error!("Error processing ambulance: {}", e);
                    }
                }
                Err(e) => error!("Error reading ambulance: {}", e),
            }
        }
    }

    if let Some(path) = &inputs.calls {
        let reader = CallReader::new(File::open(path).into_diagnostic()?).into_diagnostic()?;
        for payload in reader.calls() {
            match payload {
                Ok(payload) => {
                    if let Err(e) = engine.create_call(payload, operator).await {
                        error!("Error processing call: {}", e);
                    }
                }
                Err(e) => error!("Error reading call: {}", e),
            }
        }
    }

    if let Some(path) = &inputs.updates {
        let reader = RecordReader::new(File::open(path).into_diagnostic()?);
        let mut applied = 0usize;
        for row in reader.records::<UpdateRow>() {
            match row.and_then(UpdateRow::into_change) {
                Ok((identifier, change)) => {
                    match engine
                        .update_ambulance_by_identifier(&identifier, change, operator)
                        .await
                    {
                        Ok(_) => applied += 1,
                        Err(e) => error!("Error processing update: {}", e),
                    }
                }
                Err(e) => error!("Error reading update: {}", e),
            }
        }
        info!("Applied {} ambulance updates", applied);
    }

    Ok(())
}
