//! CLI tests for the `infra-validator` binary.
//!
//! A fake `aws` script on a private `PATH` stands in for the real CLI; no
//! `kubectl` is installed, so the cluster API check is skipped.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use infra_validator::exit_codes;
use serde_json::Value;

const FAKE_AWS: &str = r#"#!/bin/sh
case "$*" in
  "sts get-caller-identity")
    echo '{"Account": "111122223333", "Arn": "arn:aws:iam::111122223333:user/ci"}' ;;
  "ec2 describe-vpcs "*)
    echo '{"Vpcs": [{"VpcId": "vpc-1"}]}' ;;
  "ec2 describe-internet-gateways "*)
    echo '{"InternetGateways": [{"InternetGatewayId": "igw-1"}]}' ;;
  "ec2 describe-subnets "*)
    echo '{"Subnets": [{"SubnetId": "subnet-a"}, {"SubnetId": "subnet-b"}]}' ;;
  "ec2 describe-route-tables "*)
    echo '{"RouteTables": [{"Routes": [{"DestinationCidrBlock": "0.0.0.0/0", "GatewayId": "igw-1"}]}]}' ;;
  "eks describe-cluster "*)
    echo '{"cluster": {"status": "ACTIVE"}}' ;;
  "eks list-access-entries "*)
    echo '{"accessEntries": ["arn:aws:iam::111122223333:role/admin"]}' ;;
  "eks list-nodegroups "*)
    echo '{"nodegroups": ["ng-1"]}' ;;
  "eks describe-nodegroup "*)
    echo '{"nodegroup": {"status": "ACTIVE", "health": {"issues": []}}}' ;;
  "iam list-open-id-connect-providers")
    echo '{"OpenIDConnectProviderList": []}' ;;
  "iam get-role --role-name demo-GitHubOIDC")
    echo '{"Role": {"RoleName": "demo-GitHubOIDC"}}' ;;
  "iam list-policies --scope Local")
    echo '{"Policies": []}' ;;
  "ec2 describe-instances "*)
    echo '{"Reservations": [{"Instances": [{"InstanceId": "i-1", "State": {"Name": "running"}}]}]}' ;;
  *)
    echo "unexpected: $*" >&2
    exit 255 ;;
esac
"#;

const CONFIG: &str = r#"
role_name = "demo-GitHubOIDC"
policy_name = "demo-gha-eks-min"

[timeouts]
command_secs = 20
"#;

struct Sandbox {
    temp: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).expect("create bin");
        let aws = bin.join("aws");
        fs::write(&aws, FAKE_AWS).expect("write fake aws");
        fs::set_permissions(&aws, fs::Permissions::from_mode(0o755)).expect("chmod");
        fs::write(temp.path().join("validator.toml"), CONFIG).expect("write config");
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn out(&self) -> PathBuf {
        self.root().join("out")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_infra-validator"))
            .current_dir(self.root())
            .env("PATH", self.root().join("bin"))
            .env_remove("AWS_REGION")
            .env_remove("EKS_CLUSTER_NAME")
            .env_remove("PROJECT_TAG")
            .env_remove("AWS_ACCOUNT_ID")
            .args(args)
            .output()
            .expect("run infra-validator")
    }

    fn single_run_dir(&self) -> PathBuf {
        let mut dirs: Vec<PathBuf> = fs::read_dir(self.out())
            .expect("read out")
            .map(|entry| entry.expect("entry").path())
            .collect();
        assert_eq!(dirs.len(), 1, "{dirs:?}");
        dirs.remove(0)
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("parse")
}

#[test]
fn healthy_account_exits_ok() {
    let sandbox = Sandbox::new();
    let out = sandbox.out();
    let output = sandbox.run(&[
        "us-east-1",
        "demo-eks",
        "demo",
        "111122223333",
        "--output-dir",
        out.to_str().expect("utf-8 path"),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{stdout}");
    assert!(stdout.starts_with("Validation completed. Output directory: "));
    assert!(stdout.contains("Overall: PASS"));
    assert!(stdout.contains("- KubeAPI/Nodelist: SKIP"));

    let run_dir = sandbox.single_run_dir();
    let summary = read_json(&run_dir.join("summary.json"));
    assert_eq!(summary["overall"], "PASS");
    assert_eq!(summary["checks"].as_array().map(Vec::len), Some(7));
    assert_eq!(summary["checks"][6]["detail"], "kubectl not found in PATH");
    assert_eq!(read_json(&run_dir.join("meta.json"))["project_tag"], "demo");
    assert!(run_dir.join("eks_describe_nodegroup_ng-1.json").is_file());
    assert!(!run_dir.join("kubectl_healthz.txt").exists());
}

#[test]
fn wrong_account_exits_failed() {
    let sandbox = Sandbox::new();
    let out = sandbox.out();
    let output = sandbox.run(&[
        "us-east-1",
        "demo-eks",
        "demo",
        "999999999999",
        "--output-dir",
        out.to_str().expect("utf-8 path"),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED), "{stdout}");
    assert!(stdout.contains("Overall: FAIL"));
    assert!(stdout.contains("- STSIdentity: FAIL"));
    assert!(stdout.contains("- EKSCluster: PASS"));
}

#[test]
fn unwritable_output_dir_is_fatal() {
    let sandbox = Sandbox::new();
    let blocker = sandbox.root().join("blocker");
    fs::write(&blocker, "").expect("write blocker");

    let output = sandbox.run(&["--output-dir", blocker.to_str().expect("utf-8 path")]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("create output dir"));
}

#[test]
fn unknown_config_key_is_fatal() {
    let sandbox = Sandbox::new();
    let config = sandbox.root().join("bad.toml");
    fs::write(&config, "regoin = \"us-east-1\"\n").expect("write config");

    let output = sandbox.run(&["--config", config.to_str().expect("utf-8 path")]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(!sandbox.out().exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bad.toml"));
}
