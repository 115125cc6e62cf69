//! Run identity and the per-run output directory.
//!
//! Layout: `<output_dir>/<run-id>/` holding one evidence file per external
//! call plus `meta.json` and `summary.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::core::types::RunMeta;
use crate::io::config::ValidatorConfig;

pub const META_FILE: &str = "meta.json";
pub const SUMMARY_FILE: &str = "summary.json";

const RUN_ID_FORMAT: &str = "%Y%m%d-%H%M%S";
const MAX_RUN_ID_SUFFIX: u32 = 999;

/// Sortable run identifier for `now` (UTC, second granularity).
pub fn run_id_at(now: DateTime<Utc>) -> String {
    now.format(RUN_ID_FORMAT).to_string()
}

/// Immutable context of a single run. Owns the run directory.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    timestamp_utc: String,
    run_dir: PathBuf,
    config: ValidatorConfig,
}

impl RunContext {
    /// Claim a fresh run directory under `config.output_dir`.
    pub fn create(config: ValidatorConfig, now: DateTime<Utc>) -> Result<Self> {
        let timestamp_utc = run_id_at(now);
        let (run_id, run_dir) = claim_run_dir(&config.output_dir, &timestamp_utc)?;
        info!(run_id = %run_id, dir = %run_dir.display(), "run directory created");
        Ok(Self {
            run_id,
            timestamp_utc,
            run_dir,
            config,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn meta(&self) -> RunMeta {
        RunMeta {
            region: self.config.region.clone(),
            cluster_name: self.config.cluster_name.clone(),
            project_tag: self.config.project_tag.clone(),
            account_id: self.config.account_id.clone(),
            timestamp_utc: self.timestamp_utc.clone(),
        }
    }
}

/// Atomically create `<base>/<id>`, suffixing `-2`, `-3`, ... if the id is taken.
fn claim_run_dir(base: &Path, base_id: &str) -> Result<(String, PathBuf)> {
    fs::create_dir_all(base).with_context(|| format!("create output dir {}", base.display()))?;

    for suffix in 1..=MAX_RUN_ID_SUFFIX {
        let id = if suffix == 1 {
            base_id.to_string()
        } else {
            format!("{base_id}-{suffix}")
        };
        let dir = base.join(&id);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((id, dir)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(dir = %dir.display(), "run directory taken");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("create run dir {}", dir.display()));
            }
        }
    }

    Err(anyhow!(
        "unable to create a unique run dir for '{base_id}' under {} (too many runs)",
        base.display()
    ))
}
