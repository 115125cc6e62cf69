//! Infrastructure validation checklist runner.
//!
//! Checks that an account's network, managed cluster, node groups, identity
//! federation, worker instances and cluster API are in place, recording the
//! evidence under `<output_dir>/<run-id>/`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use infra_validator::core::types::OverallStatus;
use infra_validator::exit_codes;
use infra_validator::io::config::{Overrides, resolve_config};
use infra_validator::io::executor::SystemRunner;
use infra_validator::logging;
use infra_validator::report;
use infra_validator::run::run_validation;

#[derive(Parser, Debug)]
#[command(
    name = "infra-validator",
    version,
    about = "Validate cloud infrastructure and record evidence for every check"
)]
struct Cli {
    /// Cloud region [env: AWS_REGION]
    region: Option<String>,
    /// Managed cluster name [env: EKS_CLUSTER_NAME]
    cluster_name: Option<String>,
    /// Tag prefix of the network resources [env: PROJECT_TAG]
    project_tag: Option<String>,
    /// Expected account id [env: AWS_ACCOUNT_ID]
    account_id: Option<String>,
    /// TOML config file (defaults to `validator.toml` when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base directory for run directories.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            region: self.region.clone(),
            cluster_name: self.cluster_name.clone(),
            project_tag: self.project_tag.clone(),
            account_id: self.account_id.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), &cli.overrides())?;
    let outcome = run_validation(config, &SystemRunner)?;
    print!("{}", report::render(&outcome));
    Ok(match outcome.summary.overall() {
        OverallStatus::Pass => exit_codes::OK,
        OverallStatus::Fail => exit_codes::FAILED,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_arguments() {
        let cli = Cli::parse_from(["infra-validator"]);
        assert_eq!(cli.overrides(), Overrides::default());
        assert!(cli.config.is_none());
    }

    #[test]
    fn positionals_fill_in_order() {
        let cli = Cli::parse_from(["infra-validator", "eu-west-1", "prod-eks"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.region.as_deref(), Some("eu-west-1"));
        assert_eq!(overrides.cluster_name.as_deref(), Some("prod-eks"));
        assert_eq!(overrides.project_tag, None);
    }

    #[test]
    fn parse_all_arguments() {
        let cli = Cli::parse_from([
            "infra-validator",
            "eu-west-1",
            "prod-eks",
            "prod",
            "123456789012",
            "--config",
            "ci.toml",
            "--output-dir",
            "/tmp/evidence",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.account_id.as_deref(), Some("123456789012"));
        assert_eq!(overrides.output_dir, Some(PathBuf::from("/tmp/evidence")));
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
    }

    #[test]
    fn too_many_positionals_is_an_error() {
        let result = Cli::try_parse_from(["infra-validator", "a", "b", "c", "d", "e"]);
        assert!(result.is_err());
    }
}
