//! Managed cluster: reports `ACTIVE` and has at least one access entry.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{CheckEnv, ParseErrors};
use crate::core::shapes::{AccessEntryList, ClusterDescription};
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "EKSCluster";

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let cluster = env.config().cluster_name.as_str();
    let mut errors = ParseErrors::default();

    let described = env.run_recorded(
        &env.aws_regional(["eks", "describe-cluster", "--name", cluster]),
        "eks_describe_cluster.json",
    )?;
    let cluster_active = errors
        .decode::<ClusterDescription>("cluster_active", &described)
        .is_some_and(|desc| desc.is_active());

    let entries = env.run_recorded(
        &env.aws_regional(["eks", "list-access-entries", "--cluster-name", cluster]),
        "eks_list_access_entries.json",
    )?;
    let have_entries = errors
        .decode::<AccessEntryList>("access_entries>=1", &entries)
        .is_some_and(|list| !list.access_entries.is_empty());

    let mut detail = Map::new();
    detail.insert("cluster_active".to_string(), Value::Bool(cluster_active));
    detail.insert("access_entries>=1".to_string(), Value::Bool(have_entries));
    errors.attach(&mut detail);

    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(cluster_active && have_entries),
        Value::Object(detail),
    ))
}
