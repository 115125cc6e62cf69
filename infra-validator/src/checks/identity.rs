//! Caller identity: the credentials in use belong to the expected account.

use anyhow::{Context, Result};

use super::CheckEnv;
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "STSIdentity";
pub const EVIDENCE: &str = "aws_sts_get_caller_identity.json";

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let spec = env.aws(["sts", "get-caller-identity"]);
    let response = env.run_recorded(&spec, EVIDENCE)?;

    let ok = response.result.succeeded()
        && response.result.stdout.contains(&env.config().account_id);
    // The full command result (stderr included) is the detail.
    let detail = serde_json::to_value(&response.result).context("serialize identity result")?;
    Ok(CheckVerdict::new(NAME, CheckStatus::from_bool(ok), detail))
}
