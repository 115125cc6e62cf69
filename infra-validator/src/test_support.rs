//! Test-only helpers: a scripted command runner and a throwaway run directory.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tempfile::TempDir;

use crate::checks::{CheckEnv, KUBECTL};
use crate::core::types::{CheckVerdict, CommandResult};
use crate::io::config::ValidatorConfig;
use crate::io::executor::CommandRunner;
use crate::io::process::CommandSpec;
use crate::io::recorder::Recorder;
use crate::io::run_dir::RunContext;

/// Runner that answers from a table keyed by the rendered command line.
///
/// Unscripted commands behave like a missing binary. Every call is logged,
/// scripted or not.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, (i32, String, String)>,
    tools: BTreeSet<String>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `command` to exit with `exit_code` and print `stdout`.
    pub fn respond(self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.respond_full(command, exit_code, stdout, "")
    }

    pub fn respond_full(mut self, command: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            (exit_code, stdout.to_string(), stderr.to_string()),
        );
        self
    }

    /// Report `tool` as installed.
    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tools.insert(tool.to_string());
        self
    }

    pub fn without_tool(mut self, tool: &str) -> Self {
        self.tools.remove(tool);
        self
    }

    /// Command lines seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec, _timeout: Duration) -> CommandResult {
        let command = spec.to_string();
        self.calls.borrow_mut().push(command.clone());
        match self.responses.get(&command) {
            Some((exit_code, stdout, stderr)) => CommandResult {
                command,
                exit_code: *exit_code,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                launch_error: None,
            },
            None => CommandResult::launch_failure(
                command,
                format!("spawn {}: no scripted response", spec.program()),
            ),
        }
    }

    fn tool_available(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }
}

/// Deterministic configuration writing under `output_dir`.
pub fn test_config(output_dir: impl Into<std::path::PathBuf>) -> ValidatorConfig {
    ValidatorConfig {
        region: "us-east-1".to_string(),
        cluster_name: "demo-eks".to_string(),
        project_tag: "demo".to_string(),
        account_id: "111122223333".to_string(),
        role_name: "demo-GitHubOIDC".to_string(),
        policy_name: "demo-gha-eks-min".to_string(),
        output_dir: output_dir.into(),
        ..ValidatorConfig::default()
    }
}

/// A claimed run directory inside a temp dir, for driving single checks.
pub struct TestRun {
    _temp: TempDir,
    ctx: RunContext,
    recorder: Recorder,
}

impl TestRun {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let config = test_config(temp.path().join("out"));
        let now = Utc
            .with_ymd_and_hms(2025, 3, 4, 5, 6, 7)
            .single()
            .expect("timestamp");
        let ctx = RunContext::create(config, now).expect("run context");
        let recorder = Recorder::new(ctx.run_dir());
        Self {
            _temp: temp,
            ctx,
            recorder,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        self.ctx.config()
    }

    pub fn check(
        &self,
        runner: &dyn CommandRunner,
        check: fn(&CheckEnv<'_>) -> Result<CheckVerdict>,
    ) -> Result<CheckVerdict> {
        let env = CheckEnv {
            ctx: &self.ctx,
            runner,
            recorder: &self.recorder,
        };
        check(&env)
    }

    pub fn has_evidence(&self, name: &str) -> bool {
        self.ctx.run_dir().join(name).is_file()
    }

    pub fn evidence_text(&self, name: &str) -> String {
        fs::read_to_string(self.ctx.run_dir().join(name)).expect("read evidence")
    }

    pub fn evidence(&self, name: &str) -> Value {
        serde_json::from_str(&self.evidence_text(name)).expect("parse evidence")
    }
}

impl Default for TestRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner scripted so that every check in the catalog passes for `config`.
///
/// `kubectl` is installed and the single node group is `ng-default`.
pub fn healthy_runner(config: &ValidatorConfig) -> ScriptedRunner {
    let region = &config.region;
    let cluster = &config.cluster_name;
    let tag = &config.project_tag;
    let account = &config.account_id;

    ScriptedRunner::new()
        .with_tool(KUBECTL)
        .respond(
            "aws sts get-caller-identity",
            0,
            &format!(
                r#"{{"UserId": "AIDAEXAMPLE", "Account": "{account}", "Arn": "arn:aws:iam::{account}:user/ci"}}"#
            ),
        )
        .respond(
            &format!("aws ec2 describe-vpcs --filters Name=tag:Name,Values={tag}-vpc --region {region}"),
            0,
            r#"{"Vpcs": [{"VpcId": "vpc-0a1b2c"}]}"#,
        )
        .respond(
            &format!(
                "aws ec2 describe-internet-gateways --filters Name=attachment.state,Values=available --region {region}"
            ),
            0,
            r#"{"InternetGateways": [{"InternetGatewayId": "igw-0a1b2c"}]}"#,
        )
        .respond(
            &format!(
                "aws ec2 describe-subnets --filters Name=tag:Name,Values={tag}-public-* --region {region}"
            ),
            0,
            r#"{"Subnets": [{"SubnetId": "subnet-a", "AvailabilityZone": "us-east-1a"}, {"SubnetId": "subnet-b", "AvailabilityZone": "us-east-1b"}]}"#,
        )
        .respond(
            &format!("aws ec2 describe-route-tables --region {region}"),
            0,
            r#"{"RouteTables": [{"RouteTableId": "rtb-1", "Routes": [{"DestinationCidrBlock": "10.0.0.0/16", "GatewayId": "local"}, {"DestinationCidrBlock": "0.0.0.0/0", "GatewayId": "igw-0a1b2c"}]}]}"#,
        )
        .respond(
            &format!("aws eks describe-cluster --name {cluster} --region {region}"),
            0,
            &format!(r#"{{"cluster": {{"name": "{cluster}", "status": "ACTIVE"}}}}"#),
        )
        .respond(
            &format!("aws eks list-access-entries --cluster-name {cluster} --region {region}"),
            0,
            &format!(r#"{{"accessEntries": ["arn:aws:iam::{account}:role/admin"]}}"#),
        )
        .respond(
            &format!("aws eks list-nodegroups --cluster-name {cluster} --region {region}"),
            0,
            r#"{"nodegroups": ["ng-default"]}"#,
        )
        .respond(
            &format!(
                "aws eks describe-nodegroup --cluster-name {cluster} --nodegroup-name ng-default --region {region}"
            ),
            0,
            r#"{"nodegroup": {"nodegroupName": "ng-default", "status": "ACTIVE", "health": {"issues": []}}}"#,
        )
        .respond(
            "aws iam list-open-id-connect-providers",
            0,
            &format!(
                r#"{{"OpenIDConnectProviderList": [{{"Arn": "arn:aws:iam::{account}:oidc-provider/token.actions.githubusercontent.com"}}]}}"#
            ),
        )
        .respond(
            &format!("aws iam get-role --role-name {}", config.role_name),
            0,
            &format!(r#"{{"Role": {{"RoleName": "{}"}}}}"#, config.role_name),
        )
        .respond(
            "aws iam list-policies --scope Local",
            0,
            &format!(r#"{{"Policies": [{{"PolicyName": "{}"}}]}}"#, config.policy_name),
        )
        .respond(
            &format!(
                "aws ec2 describe-instances --filters Name=tag:eks:cluster-name,Values={cluster} --region {region}"
            ),
            0,
            r#"{"Reservations": [{"Instances": [{"InstanceId": "i-0123456789abcdef0", "InstanceType": "t3.medium", "Placement": {"AvailabilityZone": "us-east-1a"}, "State": {"Name": "running"}, "PublicIpAddress": "3.3.3.3"}]}]}"#,
        )
        .respond(
            &format!("aws eks update-kubeconfig --name {cluster} --region {region}"),
            0,
            &format!("Updated context {cluster} in /home/ci/.kube/config"),
        )
        .respond("kubectl get --raw=/healthz", 0, "ok")
        .respond(
            "kubectl get nodes -o json",
            0,
            r#"{"items": [{"metadata": {"name": "ip-10-0-1-10"}, "status": {"conditions": [{"type": "Ready", "status": "True"}]}}]}"#,
        )
}
