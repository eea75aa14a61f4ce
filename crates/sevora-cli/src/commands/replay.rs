//! `sevora replay`: run a scenario of oracle operations.
//!
//! A scenario is a TOML file with an ordered list of `[[step]]` tables. Each
//! step names an operation in `op` and may state the expected outcome in
//! `expect` (`"ok"` or an error code such as `"quorum_not_met"`):
//!
//! ```toml
//! [[step]]
//! op = "open"
//! request = 1
//! subject = "lisbon"
//!
//! [[step]]
//! op = "submit"
//! request = 1
//! caller = "station-a"
//! severity = 40
//!
//! [[step]]
//! op = "finalize"
//! request = 1
//! expect = "quorum_not_met"
//! ```
//!
//! A step without `expect` is expected to succeed. Admin steps run as the
//! current administrator unless `caller` is given.
//!
//! # Exit Codes
//!
//! - 0: every step matched its expectation
//! - 1: the configuration or scenario could not be loaded
//! - 2: at least one step did not match its expectation

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sevora_core::{
    EventObserver, Finalization, Oracle, OracleConfig, OracleError, OracleEvent, Principal,
    RecordingObserver, RecordingSink, RequestId, Severity, TracingObserver,
};

use super::exit_codes;

/// Arguments for `sevora replay`.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Path to the scenario file
    pub scenario: PathBuf,

    /// Emit one JSON object per step instead of text
    #[arg(long)]
    pub json: bool,

    /// Stop at the first step that does not match its expectation
    #[arg(long)]
    pub fail_fast: bool,
}

/// A parsed scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Steps in execution order.
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Loads a scenario from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parses a scenario from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse scenario")
    }
}

/// One scenario step.
#[derive(Debug, Clone)]
pub struct Step {
    /// The operation to run.
    pub op: Operation,

    /// Expected outcome: `"ok"` or an error code.
    pub expect: Option<String>,
}

// `expect` is split off by hand so the remaining keys go through
// `Operation`, which rejects anything it does not know.
impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut table = toml::Table::deserialize(deserializer)?;
        let expect = match table.remove("expect") {
            None => None,
            Some(toml::Value::String(expect)) => Some(expect),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "`expect` must be a string, found {}",
                    other.type_str()
                )));
            },
        };
        let op = toml::Value::Table(table)
            .try_into()
            .map_err(D::Error::custom)?;
        Ok(Self { op, expect })
    }
}

impl Step {
    /// Returns the expected outcome, `"ok"` unless stated.
    #[must_use]
    pub fn expected(&self) -> &str {
        self.expect.as_deref().unwrap_or("ok")
    }
}

/// Operations a scenario can perform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Operation {
    /// Open or re-open a request.
    Open {
        /// Request identifier.
        request: u64,
        /// Subject name.
        subject: String,
    },
    /// Submit a severity.
    Submit {
        /// Request identifier.
        request: u64,
        /// Submitting source.
        caller: Principal,
        /// Reported severity.
        severity: Severity,
    },
    /// Finalize a request.
    Finalize {
        /// Request identifier.
        request: u64,
    },
    /// Cancel a request (accepted and ignored).
    Cancel {
        /// Request identifier.
        request: u64,
    },
    /// Replace the administrator.
    SetAdmin {
        /// Acting principal; defaults to the current administrator.
        #[serde(default)]
        caller: Option<Principal>,
        /// New administrator.
        admin: Principal,
    },
    /// Grant or revoke submission rights.
    SetSource {
        /// Acting principal; defaults to the current administrator.
        #[serde(default)]
        caller: Option<Principal>,
        /// Affected source.
        source: Principal,
        /// Whether the source may submit.
        #[serde(default = "default_allowed")]
        allowed: bool,
    },
    /// Change the quorum.
    SetQuorum {
        /// Acting principal; defaults to the current administrator.
        #[serde(default)]
        caller: Option<Principal>,
        /// New quorum.
        quorum: u32,
    },
    /// Change both thresholds.
    SetThresholds {
        /// Acting principal; defaults to the current administrator.
        #[serde(default)]
        caller: Option<Principal>,
        /// New medium threshold.
        medium: Severity,
        /// New large threshold.
        large: Severity,
    },
    /// Set or clear the severity bound.
    SetSeverityBound {
        /// Acting principal; defaults to the current administrator.
        #[serde(default)]
        caller: Option<Principal>,
        /// New bound; omit to disable.
        #[serde(default)]
        bound: Option<Severity>,
    },
}

const fn default_allowed() -> bool {
    true
}

impl Operation {
    /// Returns the operation name as used in scenario files.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Submit { .. } => "submit",
            Self::Finalize { .. } => "finalize",
            Self::Cancel { .. } => "cancel",
            Self::SetAdmin { .. } => "set_admin",
            Self::SetSource { .. } => "set_source",
            Self::SetQuorum { .. } => "set_quorum",
            Self::SetThresholds { .. } => "set_thresholds",
            Self::SetSeverityBound { .. } => "set_severity_bound",
        }
    }

    /// Runs the operation against `oracle`.
    pub fn apply(&self, oracle: &Oracle) -> Result<Option<Finalization>, OracleError> {
        let acting = |caller: &Option<Principal>| caller.clone().unwrap_or_else(|| oracle.admin());
        match self {
            Self::Open { request, subject } => oracle.open(RequestId::new(*request), subject),
            Self::Submit {
                request,
                caller,
                severity,
            } => oracle.submit(RequestId::new(*request), caller, *severity)?,
            Self::Finalize { request } => {
                return oracle.finalize(RequestId::new(*request)).map(Some);
            },
            Self::Cancel { request } => oracle.cancel(RequestId::new(*request)),
            Self::SetAdmin { caller, admin } => oracle.set_admin(&acting(caller), admin.clone())?,
            Self::SetSource {
                caller,
                source,
                allowed,
            } => oracle.set_source(&acting(caller), source.clone(), *allowed)?,
            Self::SetQuorum { caller, quorum } => oracle.set_quorum(&acting(caller), *quorum)?,
            Self::SetThresholds {
                caller,
                medium,
                large,
            } => oracle.set_thresholds(&acting(caller), *medium, *large)?,
            Self::SetSeverityBound { caller, bound } => {
                oracle.set_severity_bound(&acting(caller), *bound)?;
            },
        }
        Ok(None)
    }
}

/// Result of one replayed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based step number.
    pub step: usize,
    /// Operation name.
    pub op: &'static str,
    /// `"ok"` or the error code.
    pub outcome: &'static str,
    /// Error message, if the step was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Expected outcome.
    pub expect: String,
    /// Whether the outcome matched the expectation.
    pub matched: bool,
    /// Finalization result for successful `finalize` steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalization: Option<Finalization>,
    /// Events emitted by the step.
    pub events: Vec<OracleEvent>,
}

/// Aggregate result of a replay.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    /// Steps executed.
    pub steps: usize,
    /// Steps rejected by the oracle.
    pub rejected: usize,
    /// Steps whose outcome did not match the expectation.
    pub mismatched: usize,
    /// Responses delivered to the sink.
    pub delivered: usize,
}

/// Replays `scenario` against a fresh oracle built from `config`.
///
/// `report` is called after every step. Stops early after the first
/// mismatch when `fail_fast` is set.
pub fn replay(
    config: &OracleConfig,
    scenario: &Scenario,
    fail_fast: bool,
    mut report: impl FnMut(&StepReport),
) -> Result<ReplaySummary> {
    let sink = Arc::new(RecordingSink::new());
    let recorder = Arc::new(RecordingObserver::new());
    let observers: [Arc<dyn EventObserver>; 2] = [recorder.clone(), Arc::new(TracingObserver)];
    let oracle = config
        .build(sink.clone(), observers)
        .context("failed to build oracle")?;

    let mut summary = ReplaySummary::default();
    for (index, step) in scenario.steps.iter().enumerate() {
        let result = step.op.apply(&oracle);
        let (outcome, error, finalization) = match result {
            Ok(finalization) => ("ok", None, finalization),
            Err(e) => {
                tracing::info!(
                    step = index + 1,
                    error_class = %e.error_class(),
                    code = e.code(),
                    "step rejected"
                );
                (e.code(), Some(e.to_string()), None)
            },
        };
        let matched = step.expected() == outcome;

        summary.steps += 1;
        if error.is_some() {
            summary.rejected += 1;
        }
        if !matched {
            summary.mismatched += 1;
        }

        let step_report = StepReport {
            step: index + 1,
            op: step.op.name(),
            outcome,
            error,
            expect: step.expected().to_string(),
            matched,
            finalization,
            events: recorder.drain(),
        };
        tracing::debug!(
            step = step_report.step,
            op = step_report.op,
            outcome,
            matched,
            "step replayed"
        );
        report(&step_report);

        if fail_fast && !matched {
            break;
        }
    }
    summary.delivered = sink.delivered().len();
    Ok(summary)
}

/// Entry point for `sevora replay`.
pub fn run(config: &OracleConfig, args: &ReplayArgs) -> Result<ExitCode> {
    let scenario = Scenario::from_file(&args.scenario)?;
    let json = args.json;

    let summary = replay(config, &scenario, args.fail_fast, |r| {
        if json {
            match serde_json::to_string(r) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to serialize step report"),
            }
        } else {
            print_text(r);
        }
    })?;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{} steps, {} rejected, {} mismatched, {} delivered",
            summary.steps, summary.rejected, summary.mismatched, summary.delivered
        );
    }

    Ok(ExitCode::from(if summary.mismatched == 0 {
        exit_codes::SUCCESS
    } else {
        exit_codes::SCENARIO_MISMATCH
    }))
}

fn print_text(r: &StepReport) {
    let marker = if r.matched { " " } else { "!" };
    match (&r.finalization, &r.error) {
        (Some(f), _) => println!(
            "{marker}[{}] {} -> ok (request {}, median {}, category {}, {} submissions)",
            r.step, r.op, f.request_id, f.median, f.category, f.submission_count
        ),
        (None, Some(err)) => println!("{marker}[{}] {} -> {}: {err}", r.step, r.op, r.outcome),
        (None, None) => println!("{marker}[{}] {} -> ok", r.step, r.op),
    }
    for event in &r.events {
        println!("    event {}", event.kind());
    }
    if !r.matched {
        println!("    expected {}, got {}", r.expect, r.outcome);
    }
}

#[cfg(test)]
mod tests {
    use sevora_core::Category;

    use super::*;

    const CONFIG: &str = r#"
[oracle]
admin = "ops"
sources = ["a", "b", "c"]

[settings]
quorum = 3
"#;

    fn run_scenario(scenario: &str) -> (ReplaySummary, Vec<StepReport>) {
        let config = OracleConfig::from_toml(CONFIG).unwrap();
        let scenario = Scenario::from_toml(scenario).unwrap();
        let mut reports = Vec::new();
        let summary = replay(&config, &scenario, false, |r| reports.push(r.clone())).unwrap();
        (summary, reports)
    }

    #[test]
    fn quorum_scenario_matches_expectations() {
        let (summary, reports) = run_scenario(
            r#"
[[step]]
op = "open"
request = 1
subject = "lisbon"

[[step]]
op = "submit"
request = 1
caller = "a"
severity = 10

[[step]]
op = "submit"
request = 1
caller = "b"
severity = 50

[[step]]
op = "finalize"
request = 1
expect = "quorum_not_met"

[[step]]
op = "submit"
request = 1
caller = "c"
severity = 5

[[step]]
op = "finalize"
request = 1
expect = "ok"

[[step]]
op = "finalize"
request = 1
expect = "already_finalized"
"#,
        );
        assert_eq!(summary.steps, 7);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.mismatched, 0);
        assert_eq!(summary.delivered, 1);
        let finalization = reports[5].finalization.unwrap();
        assert_eq!(finalization.median, 10);
        assert_eq!(finalization.category, Category::Small);
        assert_eq!(reports[5].events.len(), 1);
    }

    #[test]
    fn admin_steps_default_to_current_admin() {
        let (summary, reports) = run_scenario(
            r#"
[[step]]
op = "set_thresholds"
medium = 1
large = 2

[[step]]
op = "set_quorum"
caller = "a"
quorum = 1
expect = "unauthorized"

[[step]]
op = "set_admin"
admin = "ops-2"

[[step]]
op = "set_source"
source = "d"
"#,
        );
        assert_eq!(summary.mismatched, 0);
        assert_eq!(reports[3].outcome, "ok");
        assert!(matches!(
            reports[3].events.as_slice(),
            [OracleEvent::SourceUpdated { allowed: true, .. }]
        ));
    }

    #[test]
    fn mismatch_is_counted_and_fail_fast_stops() {
        let config = OracleConfig::from_toml(CONFIG).unwrap();
        let scenario = Scenario::from_toml(
            r#"
[[step]]
op = "finalize"
request = 9
expect = "ok"

[[step]]
op = "open"
request = 9
subject = "x"
"#,
        )
        .unwrap();
        let mut seen = 0;
        let summary = replay(&config, &scenario, true, |_| seen += 1).unwrap();
        assert_eq!(seen, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn unknown_operation_fails_to_parse() {
        assert!(Scenario::from_toml("[[step]]\nop = \"explode\"\n").is_err());
    }

    #[test]
    fn misspelled_keys_fail_to_parse() {
        for step in [
            "op = \"set_source\"\nsource = \"a\"\nalowed = false\n",
            "op = \"set_severity_bound\"\nboud = 5\n",
            "op = \"finalize\"\nrequest = 1\nexpct = \"ok\"\n",
        ] {
            let err = Scenario::from_toml(&format!("[[step]]\n{step}")).unwrap_err();
            assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
        }
    }

    #[test]
    fn expect_must_be_a_string() {
        let err = Scenario::from_toml("[[step]]\nop = \"cancel\"\nrequest = 1\nexpect = 1\n")
            .unwrap_err();
        assert!(format!("{err:#}").contains("must be a string"), "{err:#}");
    }

    #[test]
    fn revoke_and_bound_keys_take_effect() {
        let (summary, reports) = run_scenario(
            r#"
[[step]]
op = "set_source"
source = "a"
allowed = false

[[step]]
op = "set_severity_bound"
bound = 10

[[step]]
op = "submit"
request = 1
caller = "b"
severity = 11
expect = "invalid_argument"
"#,
        );
        assert_eq!(summary.mismatched, 0);
        assert!(matches!(
            reports[0].events.as_slice(),
            [OracleEvent::SourceUpdated { allowed: false, .. }]
        ));
        assert!(matches!(
            reports[1].events.as_slice(),
            [OracleEvent::SettingsUpdated {
                severity_bound: Some(10),
                ..
            }]
        ));
    }

    #[test]
    fn scenario_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, "[[step]]\nop = \"cancel\"\nrequest = 3\n").unwrap();
        let scenario = Scenario::from_file(&path).unwrap();
        assert_eq!(scenario.steps.len(), 1);
        assert_eq!(scenario.steps[0].op.name(), "cancel");
    }
}
