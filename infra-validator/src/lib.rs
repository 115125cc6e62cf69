//! Infrastructure validation checklist runner.
//!
//! Runs a fixed catalog of checks against a cloud account and a managed
//! Kubernetes cluster by shelling out to `aws` and `kubectl`, records every
//! response as evidence under a timestamped run directory, and writes a
//! pass/fail summary. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (result types, response parsing,
//!   shape predicates). No I/O.
//! - **[`io`]**: Side effects (processes, filesystem, configuration). The
//!   [`io::executor::CommandRunner`] seam lets tests script every command.
//!
//! [`checks`] holds the catalog; [`run`] drives it and [`report`] renders the
//! console summary.

pub mod checks;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
