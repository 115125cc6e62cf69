//! Cluster API reachability through `kubectl`.
//!
//! Skipped when `kubectl` is not on `PATH`. Otherwise the local kubeconfig is
//! refreshed first; that refresh is recorded but never decides the verdict.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{CheckEnv, KUBECTL, ParseErrors};
use crate::core::shapes::{NodeList, healthz_reports_ok};
use crate::core::types::{CheckStatus, CheckVerdict, CommandResult};
use crate::io::process::CommandSpec;

pub const NAME: &str = "KubeAPI/Nodelist";
pub const SKIP_REASON: &str = "kubectl not found in PATH";

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    if !env.runner.tool_available(KUBECTL) {
        tracing::info!(tool = KUBECTL, "tool not available; skipping");
        return Ok(CheckVerdict::skip(NAME, SKIP_REASON));
    }
    let config = env.config();
    let timeouts = &config.timeouts;

    let refresh = env.runner.run(
        &env.aws_regional([
            "eks",
            "update-kubeconfig",
            "--name",
            config.cluster_name.as_str(),
        ]),
        timeouts.command(),
    );
    if !refresh.succeeded() {
        tracing::warn!(rc = refresh.exit_code, "kubeconfig refresh failed");
    }
    env.recorder.write_json("eks_update_kubeconfig.json", &refresh)?;

    let healthz = env.runner.run(
        &CommandSpec::new(KUBECTL).args(["get", "--raw=/healthz"]),
        timeouts.healthz(),
    );
    env.recorder
        .write_text("kubectl_healthz.txt", &healthz_evidence(&healthz))?;
    let healthz_ok = healthz.succeeded() && healthz_reports_ok(&healthz.stdout);

    let mut errors = ParseErrors::default();
    let nodes = env.run_recorded_with_timeout(
        &CommandSpec::new(KUBECTL).args(["get", "nodes", "-o", "json"]),
        "kubectl_get_nodes.json",
        timeouts.nodes(),
    )?;
    let any_node_ready = errors
        .decode::<NodeList>("any_node_ready", &nodes)
        .is_some_and(|list| list.any_ready());

    let mut detail = Map::new();
    detail.insert("healthz_ok".to_string(), Value::Bool(healthz_ok));
    detail.insert("any_node_ready".to_string(), Value::Bool(any_node_ready));
    detail.insert("kubectl_rc".to_string(), Value::from(nodes.result.exit_code));
    errors.attach(&mut detail);

    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(healthz_ok && any_node_ready),
        Value::Object(detail),
    ))
}

fn healthz_evidence(result: &CommandResult) -> String {
    format!(
        "rc={}\nstdout={}\nstderr={}\n",
        result.exit_code, result.stdout, result.stderr
    )
}
