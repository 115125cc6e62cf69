//! Check catalog.
//!
//! Each check runs one or more commands through a [`CommandRunner`], records
//! every response it obtains, and returns a single [`CheckVerdict`]. A command
//! failure only fails the sub-condition it feeds; the `Err` path is reserved
//! for evidence that could not be written.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::parse::{decode_shape, parse_json_or_raw};
use crate::core::types::{CheckVerdict, CommandResult};
use crate::io::config::ValidatorConfig;
use crate::io::executor::CommandRunner;
use crate::io::process::CommandSpec;
use crate::io::recorder::Recorder;
use crate::io::run_dir::RunContext;

pub mod cluster;
pub mod iam;
pub mod identity;
pub mod instances;
pub mod kube_api;
pub mod network;
pub mod nodegroups;

/// Cloud provider CLI.
pub const AWS: &str = "aws";
/// Cluster CLI; optional.
pub const KUBECTL: &str = "kubectl";

/// Everything a check may touch.
#[derive(Clone, Copy)]
pub struct CheckEnv<'a> {
    pub ctx: &'a RunContext,
    pub runner: &'a dyn CommandRunner,
    pub recorder: &'a Recorder,
}

impl<'a> CheckEnv<'a> {
    pub fn config(&self) -> &'a ValidatorConfig {
        self.ctx.config()
    }

    /// `aws <args...>` without a region flag.
    pub fn aws<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(AWS).args(args)
    }

    /// `aws <args...> --region <region>`.
    pub fn aws_regional<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aws(args)
            .arg("--region")
            .arg(self.config().region.clone())
    }

    /// Run with the default timeout and record the parsed stdout as `evidence`.
    pub fn run_recorded(&self, spec: &CommandSpec, evidence: &str) -> Result<Response> {
        self.run_recorded_with_timeout(spec, evidence, self.config().timeouts.command())
    }

    pub fn run_recorded_with_timeout(
        &self,
        spec: &CommandSpec,
        evidence: &str,
        timeout: Duration,
    ) -> Result<Response> {
        let result = self.runner.run(spec, timeout);
        let parsed = parse_json_or_raw(&result.stdout);
        self.recorder.write_json(evidence, &parsed)?;
        Ok(Response { result, parsed })
    }
}

/// A command result together with its parsed stdout.
#[derive(Debug, Clone)]
pub struct Response {
    pub result: CommandResult,
    pub parsed: Value,
}

/// Shape mismatches seen while evaluating a check, keyed by sub-condition.
#[derive(Debug, Default)]
pub struct ParseErrors(BTreeMap<String, String>);

impl ParseErrors {
    /// Decode a successful response into `T`.
    ///
    /// Returns `None` when the command failed (not a parse problem) or when the
    /// shape does not match (recorded under `key`).
    pub fn decode<T: DeserializeOwned>(&mut self, key: &str, response: &Response) -> Option<T> {
        if !response.result.succeeded() {
            return None;
        }
        match decode_shape(&response.parsed) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(sub_check = key, err = %err, "unexpected response shape");
                self.0.insert(key.to_string(), err.to_string());
                None
            }
        }
    }

    /// Add a `parse_error` entry to `detail` when any mismatch was seen.
    pub fn attach(self, detail: &mut Map<String, Value>) {
        if self.0.is_empty() {
            return;
        }
        let errors = self
            .0
            .into_iter()
            .map(|(key, message)| (key, Value::String(message)))
            .collect();
        detail.insert("parse_error".to_string(), Value::Object(errors));
    }
}

/// Catalog entry: a display name and the function that evaluates it.
#[derive(Clone, Copy)]
pub struct CheckDef {
    pub name: &'static str,
    pub run: fn(&CheckEnv<'_>) -> Result<CheckVerdict>,
}

impl std::fmt::Debug for CheckDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckDef").field("name", &self.name).finish()
    }
}

const CATALOG: [CheckDef; 7] = [
    CheckDef {
        name: identity::NAME,
        run: identity::run,
    },
    CheckDef {
        name: network::NAME,
        run: network::run,
    },
    CheckDef {
        name: cluster::NAME,
        run: cluster::run,
    },
    CheckDef {
        name: nodegroups::NAME,
        run: nodegroups::run,
    },
    CheckDef {
        name: iam::NAME,
        run: iam::run,
    },
    CheckDef {
        name: instances::NAME,
        run: instances::run,
    },
    CheckDef {
        name: kube_api::NAME,
        run: kube_api::run,
    },
];

/// All checks in execution order.
pub fn catalog() -> &'static [CheckDef] {
    &CATALOG
}

/// Replace characters that are unsafe in evidence file names with `_`.
pub fn file_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
