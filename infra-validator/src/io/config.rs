//! Validator configuration.
//!
//! Resolved once at startup from, in increasing precedence: built-in defaults,
//! an optional TOML file, environment variables, and positional arguments.
//! The result is never mutated afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "validator.toml";

pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_CLUSTER_NAME: &str = "EKS_CLUSTER_NAME";
pub const ENV_PROJECT_TAG: &str = "PROJECT_TAG";
pub const ENV_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";

/// Parameters shared by every check in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    pub region: String,
    pub cluster_name: String,
    /// Prefix used by the `Name` tags of the VPC (`<tag>-vpc`) and public subnets (`<tag>-public-*`).
    pub project_tag: String,
    /// Account id expected in the caller identity.
    pub account_id: String,
    /// IAM role assumed by CI through OIDC; must exist.
    pub role_name: String,
    /// IAM policy expected to be attached to the CI role; reported as a hint only.
    pub policy_name: String,
    /// Base directory for run directories.
    pub output_dir: PathBuf,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Default per-command timeout.
    pub command_secs: u64,
    /// `kubectl get --raw=/healthz`.
    pub healthz_secs: u64,
    /// `kubectl get nodes`.
    pub nodes_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 120,
            healthz_secs: 30,
            nodes_secs: 60,
        }
    }
}

impl TimeoutConfig {
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn healthz(&self) -> Duration {
        Duration::from_secs(self.healthz_secs)
    }

    pub fn nodes(&self) -> Duration {
        Duration::from_secs(self.nodes_secs)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            cluster_name: "fastticket-eks".to_string(),
            project_tag: "fastticket".to_string(),
            account_id: "665516437576".to_string(),
            role_name: "fastticket-GitHubOIDC".to_string(),
            policy_name: "fastticket-gha-eks-min".to_string(),
            output_dir: PathBuf::from("validation_output"),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Per-invocation overrides taken from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub region: Option<String>,
    pub cluster_name: Option<String>,
    pub project_tag: Option<String>,
    pub account_id: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("region", &self.region),
            ("cluster_name", &self.cluster_name),
            ("project_tag", &self.project_tag),
            ("account_id", &self.account_id),
            ("role_name", &self.role_name),
            ("policy_name", &self.policy_name),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{field} must be non-empty"));
            }
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must be non-empty"));
        }
        if self.timeouts.command_secs == 0
            || self.timeouts.healthz_secs == 0
            || self.timeouts.nodes_secs == 0
        {
            return Err(anyhow!("timeouts must be > 0"));
        }
        Ok(())
    }

    /// Apply environment overrides; unset or blank variables are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(value) = get(ENV_REGION) {
            self.region = value;
        }
        if let Some(value) = get(ENV_CLUSTER_NAME) {
            self.cluster_name = value;
        }
        if let Some(value) = get(ENV_PROJECT_TAG) {
            self.project_tag = value;
        }
        if let Some(value) = get(ENV_ACCOUNT_ID) {
            self.account_id = value;
        }
        self
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(value) = &overrides.region {
            self.region = value.clone();
        }
        if let Some(value) = &overrides.cluster_name {
            self.cluster_name = value.clone();
        }
        if let Some(value) = &overrides.project_tag {
            self.project_tag = value.clone();
        }
        if let Some(value) = &overrides.account_id {
            self.account_id = value.clone();
        }
        if let Some(value) = &overrides.output_dir {
            self.output_dir = value.clone();
        }
        self
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ValidatorConfig::default()`.
pub fn load_config(path: &Path) -> Result<ValidatorConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file absent, using defaults");
        return Ok(ValidatorConfig::default());
    }
    read_config(path)
}

fn read_config(path: &Path) -> Result<ValidatorConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ValidatorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), "config file loaded");
    Ok(cfg)
}

/// Resolve the effective configuration for this process.
///
/// An explicit `config_path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
/// used when present.
pub fn resolve_config(config_path: Option<&Path>, overrides: &Overrides) -> Result<ValidatorConfig> {
    resolve_config_with_env(config_path, overrides, |key| std::env::var(key).ok())
}

pub fn resolve_config_with_env<F>(
    config_path: Option<&Path>,
    overrides: &Overrides,
    lookup: F,
) -> Result<ValidatorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match config_path {
        Some(path) => read_config(path)?,
        None => load_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    let cfg = base.with_env(lookup).with_overrides(overrides);
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}
