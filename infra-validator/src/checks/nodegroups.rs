//! Node groups: the list call succeeds and at least one group is `ACTIVE`.
//!
//! `listed` reports whether the list itself was obtained; an empty list is
//! still listed. Every listed group is described, and its status and health
//! issues are recorded whether or not the check passes.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{CheckEnv, ParseErrors, file_component};
use crate::core::shapes::{ACTIVE_STATUS, NodegroupDescription, NodegroupList};
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "EKSNodeGroups";

#[derive(Debug, Clone, Serialize)]
struct NodegroupReport {
    name: String,
    status: Option<String>,
    issues: Vec<Value>,
}

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let cluster = env.config().cluster_name.as_str();
    let mut errors = ParseErrors::default();

    let listed = env.run_recorded(
        &env.aws_regional(["eks", "list-nodegroups", "--cluster-name", cluster]),
        "eks_list_nodegroups.json",
    )?;
    let list = errors.decode::<NodegroupList>("listed", &listed);
    let is_listed = list.is_some();
    let names = list.map(|list| list.nodegroups).unwrap_or_default();

    let mut reports = Vec::with_capacity(names.len());
    let mut evidence_names = BTreeSet::new();
    for name in &names {
        let described = env.run_recorded(
            &env.aws_regional([
                "eks",
                "describe-nodegroup",
                "--cluster-name",
                cluster,
                "--nodegroup-name",
                name.as_str(),
            ]),
            &describe_evidence_name(name, &mut evidence_names),
        )?;
        let desc = errors
            .decode::<NodegroupDescription>(&format!("nodegroup:{name}"), &described)
            .unwrap_or_default();
        reports.push(NodegroupReport {
            name: name.clone(),
            status: desc.status().map(str::to_string),
            issues: desc.issues().to_vec(),
        });
    }

    let any_active = reports
        .iter()
        .any(|report| report.status.as_deref() == Some(ACTIVE_STATUS));

    let mut detail = Map::new();
    detail.insert("listed".to_string(), Value::Bool(is_listed));
    detail.insert("any_active".to_string(), Value::Bool(any_active));
    detail.insert("nodegroups".to_string(), serde_json::to_value(&reports)?);
    errors.attach(&mut detail);

    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(is_listed && any_active),
        Value::Object(detail),
    ))
}

/// Evidence file for one group's descriptor.
///
/// Names that sanitize to the same component get `-2`, `-3`, ... so no group's
/// evidence replaces another's.
fn describe_evidence_name(name: &str, taken: &mut BTreeSet<String>) -> String {
    let base = file_component(name);
    let mut component = base.clone();
    let mut suffix = 2;
    while !taken.insert(component.clone()) {
        component = format!("{base}-{suffix}");
        suffix += 1;
    }
    format!("eks_describe_nodegroup_{component}.json")
}
