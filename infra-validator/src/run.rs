//! Orchestration for a single validation run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::checks::{CheckEnv, catalog};
use crate::core::types::{CheckStatus, RunSummary};
use crate::io::config::ValidatorConfig;
use crate::io::executor::CommandRunner;
use crate::io::recorder::Recorder;
use crate::io::run_dir::{META_FILE, RunContext, SUMMARY_FILE};

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Directory holding the evidence, `meta.json` and `summary.json`.
    pub run_dir: PathBuf,
    pub summary: RunSummary,
}

/// Run every check in catalog order against the current time.
pub fn run_validation(config: ValidatorConfig, runner: &dyn CommandRunner) -> Result<RunOutcome> {
    run_validation_at(config, runner, Utc::now())
}

/// Run every check, stamping the run with `now`.
///
/// Check failures never stop the run; only a failure to write to the run
/// directory does, and in that case no summary is written.
#[instrument(skip_all, fields(region = %config.region, cluster = %config.cluster_name))]
pub fn run_validation_at(
    config: ValidatorConfig,
    runner: &dyn CommandRunner,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let ctx = RunContext::create(config, now)?;
    let recorder = Recorder::new(ctx.run_dir());
    let meta = ctx.meta();
    recorder.write_json(META_FILE, &meta)?;

    let env = CheckEnv {
        ctx: &ctx,
        runner,
        recorder: &recorder,
    };
    let mut summary = RunSummary::new(meta);
    for check in catalog() {
        info!(check = check.name, "running check");
        let verdict = (check.run)(&env)
            .with_context(|| format!("check {} failed to record evidence", check.name))?;
        match verdict.status {
            CheckStatus::Fail => warn!(check = check.name, "check failed"),
            status => info!(check = check.name, status = %status, "check finished"),
        }
        summary.push(verdict);
    }

    recorder.write_json(SUMMARY_FILE, &summary)?;
    info!(
        run_id = ctx.run_id(),
        overall = %summary.overall(),
        "validation completed"
    );
    Ok(RunOutcome {
        run_dir: ctx.run_dir().to_path_buf(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::KUBECTL;
    use crate::core::types::OverallStatus;
    use crate::test_support::{ScriptedRunner, healthy_runner, test_config};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).single().expect("timestamp")
    }

    fn read_json(path: PathBuf) -> Value {
        serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("parse")
    }

    #[test]
    fn healthy_environment_passes_every_check() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = healthy_runner(&config);

        let outcome = run_validation_at(config, &runner, fixed_now()).expect("run");
        assert_eq!(outcome.summary.overall(), OverallStatus::Pass);
        assert_eq!(outcome.summary.checks().len(), 7);
        assert!(
            outcome
                .summary
                .checks()
                .iter()
                .all(|verdict| verdict.status == CheckStatus::Pass)
        );
        assert_eq!(outcome.run_dir, temp.path().join("20250304-050607"));
    }

    #[test]
    fn meta_and_summary_are_written() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = healthy_runner(&config);

        let outcome = run_validation_at(config, &runner, fixed_now()).expect("run");
        let meta = read_json(outcome.run_dir.join(META_FILE));
        assert_eq!(meta["timestamp_utc"], "20250304-050607");
        assert_eq!(meta["cluster_name"], "demo-eks");

        let summary = read_json(outcome.run_dir.join(SUMMARY_FILE));
        assert_eq!(summary["overall"], "PASS");
        assert_eq!(summary["meta"], meta);
        assert_eq!(summary["checks"][0]["name"], "STSIdentity");
        assert_eq!(summary["checks"][6]["name"], "KubeAPI/Nodelist");
    }

    #[test]
    fn missing_tools_fail_every_check_but_skip_kube_api() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = ScriptedRunner::new();

        let outcome = run_validation_at(config, &runner, fixed_now()).expect("run");
        let statuses: Vec<CheckStatus> = outcome
            .summary
            .checks()
            .iter()
            .map(|verdict| verdict.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                CheckStatus::Fail,
                CheckStatus::Fail,
                CheckStatus::Fail,
                CheckStatus::Fail,
                CheckStatus::Fail,
                CheckStatus::Fail,
                CheckStatus::Skip,
            ]
        );
        assert_eq!(outcome.summary.overall(), OverallStatus::Fail);
    }

    #[test]
    fn skipped_kube_api_keeps_overall_pass() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = healthy_runner(&config).without_tool(KUBECTL);

        let outcome = run_validation_at(config, &runner, fixed_now()).expect("run");
        assert_eq!(outcome.summary.checks()[6].status, CheckStatus::Skip);
        assert_eq!(outcome.summary.overall(), OverallStatus::Pass);
    }

    #[test]
    fn a_failing_check_does_not_stop_later_checks() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = healthy_runner(&config).respond_full(
            "aws sts get-caller-identity",
            255,
            "",
            "ExpiredToken",
        );

        let outcome = run_validation_at(config, &runner, fixed_now()).expect("run");
        assert_eq!(outcome.summary.checks()[0].status, CheckStatus::Fail);
        assert_eq!(outcome.summary.checks()[1].status, CheckStatus::Pass);
        assert_eq!(outcome.summary.overall(), OverallStatus::Fail);
        assert!(runner.calls().iter().any(|call| call == "kubectl get nodes -o json"));
    }

    #[test]
    fn same_second_runs_get_distinct_directories() {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path());
        let runner = healthy_runner(&config);

        let first = run_validation_at(config.clone(), &runner, fixed_now()).expect("first run");
        let second = run_validation_at(config, &runner, fixed_now()).expect("second run");
        assert_ne!(first.run_dir, second.run_dir);
        assert_eq!(second.run_dir, temp.path().join("20250304-050607-2"));
        assert!(first.run_dir.join(SUMMARY_FILE).is_file());
        assert!(second.run_dir.join(SUMMARY_FILE).is_file());
    }

    #[test]
    fn unwritable_output_dir_is_fatal() {
        let temp = TempDir::new().expect("temp dir");
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "").expect("write blocker");
        let config = test_config(&blocker);
        let runner = healthy_runner(&config);

        let err = run_validation_at(config, &runner, fixed_now()).expect_err("fatal");
        assert!(format!("{err:#}").contains("create output dir"));
        assert!(runner.calls().is_empty());
    }
}
