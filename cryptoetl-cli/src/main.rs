//! cryptoetl CLI: the surface an external scheduler invokes.
//!
//! Commands:
//! - `run`: extract then load in one process
//! - `extract`: extract and publish the payload to a file hand-off slot
//! - `load`: load the payload from a file hand-off slot, consuming the slot
//!   only once the load has committed so a failed load can be retried
//!
//! `extract` records the run id it used, so `load` without `--run-id` picks
//! up that slot even if it runs on a later date. Schedulers that run several
//! extracts before loading should pass the same `--run-id` to both stages.
//!
//! Secrets are read from the environment (a `.env` file is honoured):
//! `ALPHA_VANTAGE_API_KEY` and `CRYPTOETL_DB_PASSWORD`.
//! Any run-level failure exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryptoetl_core::config::ApiKey;
use cryptoetl_core::data::{AlphaVantageSource, LogProgress};
use cryptoetl_runner::{
    consume_payload, load_into_postgres, read_payload, run_extract, DbPassword, FileHandoff,
    HandoffChannel, MemoryHandoff, PipelineConfig,
};
use log::{info, warn};
use std::path::{Path, PathBuf};

const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";
const DB_PASSWORD_ENV: &str = "CRYPTOETL_DB_PASSWORD";
const DEFAULT_CONFIG: &str = "cryptoetl.toml";

#[derive(Parser)]
#[command(
    name = "cryptoetl",
    about = "cryptoetl: daily digital-currency market data into PostgreSQL"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./cryptoetl.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every configured symbol, then load the results.
    Run,
    /// Extract and publish the payload for a later `load`.
    Extract {
        /// Hand-off slot key. Defaults to today's UTC date.
        #[arg(long)]
        run_id: Option<String>,

        /// Directory holding hand-off slots.
        #[arg(long, default_value = "handoff")]
        handoff_dir: PathBuf,
    },
    /// Load the payload published by `extract`.
    Load {
        /// Hand-off slot key. Defaults to the slot `extract` last published.
        #[arg(long)]
        run_id: Option<String>,

        /// Directory holding hand-off slots.
        #[arg(long, default_value = "handoff")]
        handoff_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_all(&config),
        Commands::Extract {
            run_id,
            handoff_dir,
        } => {
            config.validate_for_extract()?;
            let run_id = run_id.unwrap_or_else(today);
            let mut slot = FileHandoff::new(handoff_dir, &run_id)?;
            extract_stage(&config, &mut slot)
        }
        Commands::Load {
            run_id,
            handoff_dir,
        } => {
            config.validate_for_load()?;
            let mut slot = load_slot(handoff_dir, run_id)?;
            info!("Loading hand-off slot '{}'", slot.run_id());
            load_stage(&config, &mut slot)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            PipelineConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("loading config from {DEFAULT_CONFIG}"))?
        }
        None => PipelineConfig::default(),
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        config = config.with_api_key(ApiKey::new(key));
    }
    if let Ok(password) = std::env::var(DB_PASSWORD_ENV) {
        config = config.with_db_password(DbPassword::new(password));
    }
    Ok(config)
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn load_slot(dir: PathBuf, run_id: Option<String>) -> Result<FileHandoff> {
    if let Some(run_id) = run_id {
        return Ok(FileHandoff::new(dir, &run_id)?);
    }
    match FileHandoff::latest(&dir)? {
        Some(slot) => Ok(slot),
        None => Ok(FileHandoff::new(dir, &today())?),
    }
}

fn run_all(config: &PipelineConfig) -> Result<()> {
    config.validate_for_extract()?;
    config.validate_for_load()?;

    let mut channel = MemoryHandoff::new();
    extract_stage(config, &mut channel)?;
    load_stage(config, &mut channel)
}

fn extract_stage(config: &PipelineConfig, channel: &mut dyn HandoffChannel) -> Result<()> {
    let source = AlphaVantageSource::new(&config.extract)?;
    let summary = run_extract(&source, &config.extract.symbols, channel, &LogProgress)?;

    info!(
        "Extract complete: {} document(s) handed off, {} symbol(s) failed",
        summary.documents,
        summary.failed.len()
    );
    for (symbol, reason) in &summary.failed {
        warn!("  {symbol}: {reason}");
    }
    Ok(())
}

fn load_stage(config: &PipelineConfig, channel: &mut dyn HandoffChannel) -> Result<()> {
    let payload = read_payload(channel)?;

    // The blocking HTTP client must not live inside a runtime, so the
    // runtime is created only for the load stage.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;
    let report = runtime.block_on(load_into_postgres(&config.database, &payload))?;
    consume_payload(channel)?;

    info!(
        "Load complete: {} row(s) committed ({})",
        report.rows,
        report.symbols.join(", ")
    );
    Ok(())
}
