//! Configuration and aggregation helpers that do not need an oracle.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use sevora_core::{AggregationSettings, OracleConfig, Principal, Severity, SettingsMode};

use super::exit_codes;

/// Effective configuration as printed by `check-config`.
#[derive(Debug, Serialize)]
struct ConfigSummary<'a> {
    admin: &'a Principal,
    sources: &'a [Principal],
    quorum: u32,
    medium_threshold: Severity,
    large_threshold: Severity,
    severity_bound: Option<Severity>,
    mode: SettingsMode,
}

impl<'a> ConfigSummary<'a> {
    fn new(config: &'a OracleConfig, settings: &AggregationSettings) -> Self {
        Self {
            admin: &config.oracle.admin,
            sources: &config.oracle.sources,
            quorum: settings.quorum(),
            medium_threshold: settings.thresholds().medium(),
            large_threshold: settings.thresholds().large(),
            severity_bound: settings.severity_bound(),
            mode: settings.mode(),
        }
    }
}

/// Prints the validated configuration.
pub fn check_config(config: &OracleConfig, json: bool) -> Result<ExitCode> {
    let settings = config.settings.to_settings()?;
    let summary = ConfigSummary::new(config, &settings);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Configuration OK");
        println!("  admin:       {}", summary.admin);
        println!("  sources:     {}", summary.sources.len());
        println!("  quorum:      {}", summary.quorum);
        println!(
            "  thresholds:  S < {} <= M < {} <= L",
            summary.medium_threshold, summary.large_threshold
        );
        match summary.severity_bound {
            Some(bound) => println!("  bound:       {bound}"),
            None => println!("  bound:       none"),
        }
        println!("  mode:        {}", summary.mode);
    }
    Ok(ExitCode::from(exit_codes::SUCCESS))
}

/// Prints the median of `values`.
pub fn median(values: &[Severity]) -> Result<ExitCode> {
    println!("{}", sevora_core::median(values)?);
    Ok(ExitCode::from(exit_codes::SUCCESS))
}

/// Prints the category of `value` under the configured thresholds.
pub fn classify(config: &OracleConfig, value: Severity) -> Result<ExitCode> {
    let settings = config.settings.to_settings()?;
    println!("{}", sevora_core::classify(value, settings.thresholds()));
    Ok(ExitCode::from(exit_codes::SUCCESS))
}
