//! sevora - severity quorum oracle
//!
//! Command-line host for the oracle core: validates configuration, runs the
//! aggregation functions on ad-hoc values, and replays request scenarios.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sevora_core::OracleConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// sevora - severity quorum oracle
#[derive(Parser, Debug)]
#[command(name = "sevora")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to oracle configuration file
    #[arg(short, long, default_value = "sevora.toml")]
    config: PathBuf,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration, then print the effective settings
    CheckConfig {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the median of the given severities
    Median {
        /// Severities to aggregate
        #[arg(required = true)]
        values: Vec<u16>,
    },

    /// Classify a severity with the configured thresholds
    Classify {
        /// Severity to classify
        value: u16,
    },

    /// Replay a scenario of oracle operations
    Replay(commands::replay::ReplayArgs),
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<OracleConfig> {
    OracleConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::CheckConfig { json } => {
            let config = load_config(&cli.config)?;
            commands::inspect::check_config(&config, json)
        },
        Commands::Median { values } => commands::inspect::median(&values),
        Commands::Classify { value } => {
            let config = load_config(&cli.config)?;
            commands::inspect::classify(&config, value)
        },
        Commands::Replay(args) => {
            let config = load_config(&cli.config)?;
            commands::replay::run(&config, &args)
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::from(commands::exit_codes::ERROR);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(commands::exit_codes::ERROR)
        },
    }
}
