//! Identity federation: OIDC providers are listable and the CI role exists.
//!
//! The least-privilege policy is looked up too, but only reported as a hint.

use anyhow::Result;
use serde_json::{Map, Value};

use super::{CheckEnv, ParseErrors};
use crate::core::shapes::{OidcProviderList, PolicyList, RoleLookup};
use crate::core::types::{CheckStatus, CheckVerdict};

pub const NAME: &str = "IAM(OIDC/Role/Policy)";

pub fn run(env: &CheckEnv<'_>) -> Result<CheckVerdict> {
    let config = env.config();
    let mut errors = ParseErrors::default();

    let providers = env.run_recorded(
        &env.aws(["iam", "list-open-id-connect-providers"]),
        "iam_list_open_id_connect_providers.json",
    )?;
    let oidc_list_ok = providers.parsed.is_object()
        && errors
            .decode::<OidcProviderList>("oidc_list_ok", &providers)
            .is_some();

    let role = env.run_recorded(
        &env.aws(["iam", "get-role", "--role-name", config.role_name.as_str()]),
        "iam_get_role_github_actions.json",
    )?;
    let role_found = errors
        .decode::<RoleLookup>("role_found", &role)
        .is_some_and(|lookup| lookup.has_name(&config.role_name));

    let policies = env.run_recorded(
        &env.aws(["iam", "list-policies", "--scope", "Local"]),
        "iam_list_policies_local.json",
    )?;
    let policy_found = errors
        .decode::<PolicyList>("policy_found_hint", &policies)
        .is_some_and(|list| list.contains(&config.policy_name));

    let mut detail = Map::new();
    detail.insert("oidc_list_ok".to_string(), Value::Bool(oidc_list_ok));
    detail.insert("role_found".to_string(), Value::Bool(role_found));
    detail.insert("policy_found_hint".to_string(), Value::Bool(policy_found));
    errors.attach(&mut detail);

    Ok(CheckVerdict::new(
        NAME,
        CheckStatus::from_bool(oidc_list_ok && role_found),
        Value::Object(detail),
    ))
}
