//! Command runner abstraction used by every check.
//!
//! The [`CommandRunner`] trait decouples checks from real process execution.
//! Tests use scripted runners that return predetermined results without
//! spawning anything.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::core::types::CommandResult;
use crate::io::process::{CommandSpec, run_command};

/// Abstraction over command execution backends.
pub trait CommandRunner {
    /// Run `spec`, waiting at most `timeout`. Must never panic or fail.
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandResult;

    /// Whether `tool` can be launched from this environment.
    fn tool_available(&self, tool: &str) -> bool;
}

/// Runner that spawns real child processes and resolves tools on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandResult {
        run_command(spec, timeout)
    }

    fn tool_available(&self, tool: &str) -> bool {
        let found = find_on_path(tool);
        debug!(tool, found = ?found, "tool lookup");
        found.is_some()
    }
}

/// Locate `tool` on the current `PATH`.
pub fn find_on_path(tool: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in_path_var(tool, &path_var)
}

/// Locate `tool` in the directories of a `PATH`-style value.
///
/// A `tool` containing a path separator is checked directly.
pub fn find_in_path_var(tool: &str, path_var: &OsStr) -> Option<PathBuf> {
    let tool_path = Path::new(tool);
    if tool_path.components().count() > 1 {
        return is_executable(tool_path).then(|| tool_path.to_path_buf());
    }
    std::env::split_paths(path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
