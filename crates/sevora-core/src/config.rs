//! Oracle configuration.
//!
//! Configuration is a TOML document with an `[oracle]` section naming the
//! principals and a `[settings]` section with the aggregation rules:
//!
//! ```toml
//! [oracle]
//! admin = "ops"
//! sources = ["station-a", "station-b", "station-c"]
//!
//! [settings]
//! quorum = 3
//! medium_threshold = 20
//! large_threshold = 100
//! # severity_bound = 10000
//! mode = "live"
//! ```
//!
//! Every field has a default except `oracle.admin`. Unknown keys are
//! rejected.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Thresholds;
use crate::error::OracleError;
use crate::events::EventObserver;
use crate::oracle::Oracle;
use crate::principal::Principal;
use crate::request::Severity;
use crate::settings::{AggregationSettings, SettingsMode, default_quorum, default_thresholds};
use crate::sink::ResponseSink;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level oracle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Principals.
    pub oracle: PrincipalsSection,

    /// Aggregation rules.
    #[serde(default)]
    pub settings: SettingsSection,
}

/// The `[oracle]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalsSection {
    /// Initial administrator, also authorized as a source.
    pub admin: Principal,

    /// Additional authorized sources.
    #[serde(default)]
    pub sources: Vec<Principal>,
}

/// The `[settings]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// Minimum distinct submissions before finalization.
    #[serde(default = "default_quorum")]
    pub quorum: u32,

    /// Lower bound of the `M` category.
    #[serde(default = "default_medium")]
    pub medium_threshold: Severity,

    /// Lower bound of the `L` category.
    #[serde(default = "default_large")]
    pub large_threshold: Severity,

    /// Reject severities above this value. Unset means no bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_bound: Option<Severity>,

    /// When requests read their quorum and thresholds.
    #[serde(default)]
    pub mode: SettingsMode,
}

const fn default_medium() -> Severity {
    default_thresholds().medium()
}

const fn default_large() -> Severity {
    default_thresholds().large()
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            medium_threshold: default_medium(),
            large_threshold: default_large(),
            severity_bound: None,
            mode: SettingsMode::Live,
        }
    }
}

impl SettingsSection {
    /// Converts the section into validated settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the quorum is zero or the
    /// thresholds are not strictly ordered.
    pub fn to_settings(&self) -> Result<AggregationSettings, ConfigError> {
        let thresholds = Thresholds::new(self.medium_threshold, self.large_threshold)
            .map_err(validation)?;
        Ok(AggregationSettings::new(self.quorum, thresholds)
            .map_err(validation)?
            .with_severity_bound(self.severity_bound)
            .with_mode(self.mode))
    }
}

impl OracleConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(admin: Principal) -> Self {
        Self {
            oracle: PrincipalsSection {
                admin,
                sources: Vec::new(),
            },
            settings: SettingsSection::default(),
        }
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the configuration without building anything.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oracle.admin.is_null() {
            return Err(ConfigError::Validation(
                "oracle.admin must not be empty".to_string(),
            ));
        }
        if let Some(i) = self.oracle.sources.iter().position(Principal::is_null) {
            return Err(ConfigError::Validation(format!(
                "oracle.sources[{i}] must not be empty"
            )));
        }
        self.settings.to_settings().map(|_| ())
    }

    /// Builds an oracle from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the configuration is invalid.
    pub fn build(
        &self,
        sink: Arc<dyn ResponseSink>,
        observers: impl IntoIterator<Item = Arc<dyn EventObserver>>,
    ) -> Result<Oracle, ConfigError> {
        self.validate()?;
        let admin = &self.oracle.admin;
        let mut oracle =
            Oracle::new(admin.clone(), self.settings.to_settings()?, sink).map_err(validation)?;
        for source in &self.oracle.sources {
            oracle
                .set_source(admin, source.clone(), true)
                .map_err(validation)?;
        }
        // Observers are attached after seeding so configured sources do not
        // show up as runtime membership changes.
        for observer in observers {
            oracle = oracle.with_observer(observer);
        }
        Ok(oracle)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn validation(err: OracleError) -> ConfigError {
    ConfigError::Validation(err.to_string())
}
