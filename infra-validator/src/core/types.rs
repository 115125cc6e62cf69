//! Shared deterministic types for check results and run summaries.
//!
//! These types define the stable contracts written to `meta.json` and
//! `summary.json`. They hold no I/O handles and are never mutated once built,
//! except for the verdict list that [`RunSummary::push`] grows during a run.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Exit code reported when a command could not be launched or completed.
pub const LAUNCH_FAILURE_CODE: i32 = 997;

/// Captured outcome of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Command line as it was executed.
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Why the command never produced an exit code (spawn failure, timeout, decode error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
}

impl CommandResult {
    /// Result for a command that could not be launched or did not finish.
    ///
    /// Output is always empty so downstream checks never see partial data.
    pub fn launch_failure(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exit_code: LAUNCH_FAILURE_CODE,
            stdout: String::new(),
            stderr: String::new(),
            launch_error: Some(reason.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// The check had nothing applicable to evaluate (e.g. an optional tool is absent).
    Skip,
}

impl CheckStatus {
    pub fn from_bool(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named verdict produced by one check, with a free-form detail payload
/// describing the sub-conditions that were evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckVerdict {
    pub name: String,
    pub status: CheckStatus,
    pub detail: Value,
}

impl CheckVerdict {
    pub fn new(name: impl Into<String>, status: CheckStatus, detail: Value) -> Self {
        Self {
            name: name.into(),
            status,
            detail,
        }
    }

    pub fn skip(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Skip, Value::String(reason.into()))
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Fail,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status is `Fail` iff any verdict failed; skips never fail a run.
pub fn overall_status(verdicts: &[CheckVerdict]) -> OverallStatus {
    if verdicts.iter().any(|v| v.status == CheckStatus::Fail) {
        OverallStatus::Fail
    } else {
        OverallStatus::Pass
    }
}

/// Run parameters persisted to `meta.json` and embedded in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub region: String,
    pub cluster_name: String,
    pub project_tag: String,
    pub account_id: String,
    pub timestamp_utc: String,
}

/// Terminal artifact of a run (`summary.json`).
///
/// `overall` is derived from the verdicts, also when a summary is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SummaryRecord")]
pub struct RunSummary {
    pub meta: RunMeta,
    checks: Vec<CheckVerdict>,
    overall: OverallStatus,
}

/// Stored form of a summary; any stored `overall` is ignored.
#[derive(Deserialize)]
struct SummaryRecord {
    meta: RunMeta,
    checks: Vec<CheckVerdict>,
}

impl From<SummaryRecord> for RunSummary {
    fn from(record: SummaryRecord) -> Self {
        let overall = overall_status(&record.checks);
        Self {
            meta: record.meta,
            checks: record.checks,
            overall,
        }
    }
}

impl RunSummary {
    pub fn new(meta: RunMeta) -> Self {
        Self {
            meta,
            checks: Vec::new(),
            overall: OverallStatus::Pass,
        }
    }

    /// Append a verdict in execution order.
    pub fn push(&mut self, verdict: CheckVerdict) {
        self.checks.push(verdict);
        self.overall = overall_status(&self.checks);
    }

    pub fn checks(&self) -> &[CheckVerdict] {
        &self.checks
    }

    pub fn overall(&self) -> OverallStatus {
        self.overall
    }
}
