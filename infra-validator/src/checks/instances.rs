//! Worker inventory: at least one instance is tagged as owned by the cluster.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{CheckEnv, ParseErrors};
use crate::core::shapes::InstanceReservations;
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "EC2InstancesForCluster";

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let cluster = &env.config().cluster_name;
    let mut errors = ParseErrors::default();

    let response = env.run_recorded(
        &env.aws_regional([
            "ec2".to_string(),
            "describe-instances".to_string(),
            "--filters".to_string(),
            format!("Name=tag:eks:cluster-name,Values={cluster}"),
        ]),
        "ec2_describe_instances_by_cluster.json",
    )?;
    let instances = errors
        .decode::<InstanceReservations>("instances", &response)
        .map(|data| data.summaries())
        .unwrap_or_default();
    tracing::debug!(count = instances.len(), "cluster instances");

    let ok = response.result.succeeded() && !instances.is_empty();
    let mut detail = Map::new();
    detail.insert("instances".to_string(), serde_json::to_value(&instances)?);
    errors.attach(&mut detail);

    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(ok),
        Value::Object(detail),
    ))
}
