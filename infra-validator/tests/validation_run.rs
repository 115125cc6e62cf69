//! Library-level run tests: configuration resolution feeding a full run.

use std::fs;

use chrono::{TimeZone, Utc};
use infra_validator::checks::KUBECTL;
use infra_validator::core::types::{CheckStatus, OverallStatus, RunSummary};
use infra_validator::io::config::{Overrides, resolve_config_with_env};
use infra_validator::report;
use infra_validator::run::run_validation_at;
use infra_validator::test_support::healthy_runner;

#[test]
fn config_file_env_and_arguments_shape_the_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("validator.toml");
    fs::write(
        &config_path,
        format!(
            "cluster_name = \"file-eks\"\nproject_tag = \"demo\"\naccount_id = \"111122223333\"\n\
             role_name = \"demo-GitHubOIDC\"\npolicy_name = \"demo-gha-eks-min\"\n\
             output_dir = {:?}\n",
            temp.path().join("evidence")
        ),
    )
    .expect("write config");
    let overrides = Overrides {
        cluster_name: Some("demo-eks".to_string()),
        ..Overrides::default()
    };
    let env = |key: &str| (key == "AWS_REGION").then(|| "eu-west-1".to_string());

    let config = resolve_config_with_env(Some(&config_path), &overrides, env).expect("config");
    assert_eq!(config.region, "eu-west-1");
    assert_eq!(config.cluster_name, "demo-eks");

    let runner = healthy_runner(&config);
    let now = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).single().expect("timestamp");
    let outcome = run_validation_at(config, &runner, now).expect("run");

    assert_eq!(outcome.summary.overall(), OverallStatus::Pass);
    assert_eq!(outcome.run_dir, temp.path().join("evidence").join("20250304-050607"));
    assert!(runner.calls().iter().all(|call| {
        !call.contains("--region") || call.ends_with("--region eu-west-1")
    }));

    let written: RunSummary = serde_json::from_str(
        &fs::read_to_string(outcome.run_dir.join("summary.json")).expect("read summary"),
    )
    .expect("parse summary");
    assert_eq!(written, outcome.summary);
    assert_eq!(written.meta.region, "eu-west-1");
}

#[test]
fn report_reflects_skips_and_failures() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = infra_validator::test_support::test_config(temp.path());
    let runner = healthy_runner(&config)
        .without_tool(KUBECTL)
        .respond("aws iam list-policies --scope Local", 0, "not json");
    let now = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).single().expect("timestamp");

    let outcome = run_validation_at(config, &runner, now).expect("run");
    let iam = &outcome.summary.checks()[4];
    assert_eq!(iam.status, CheckStatus::Pass);
    assert_eq!(iam.detail["policy_found_hint"], false);
    assert!(iam.detail["parse_error"]["policy_found_hint"].is_string());

    let text = report::render(&outcome);
    assert!(text.contains("Overall: PASS\n"));
    assert!(text.ends_with("- KubeAPI/Nodelist: SKIP\n"));
}
