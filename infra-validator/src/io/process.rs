//! Helpers for running child processes with timeouts.
//!
//! [`run_command`] never fails: anything that prevents a command from producing
//! an exit code is folded into a [`CommandResult`] with
//! [`LAUNCH_FAILURE_CODE`](crate::core::types::LAUNCH_FAILURE_CODE).

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::types::CommandResult;

/// Program plus arguments, executed directly (no shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

fn quote_word(word: &str) -> String {
    let needs_quotes = word.is_empty()
        || word
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if needs_quotes {
        format!("'{}'", word.replace('\'', r"'\''"))
    } else {
        word.to_string()
    }
}

/// Run a command with a timeout and capture trimmed stdout/stderr.
///
/// Output is read on background threads while the child runs so a chatty
/// command cannot deadlock on a full pipe. `timeout` bounds both the wait for
/// the child and the wait for its pipes to close, so a background grandchild
/// holding stdout open cannot extend the call. On timeout the child is killed
/// and reaped and the result carries no output.
#[instrument(skip_all, fields(command = %spec, timeout_secs = timeout.as_secs()))]
pub fn run_command(spec: &CommandSpec, timeout: Duration) -> CommandResult {
    let command = spec.to_string();
    match run_captured(spec, timeout) {
        Ok(captured) => {
            debug!(exit_code = captured.exit_code, "command finished");
            CommandResult {
                command,
                exit_code: captured.exit_code,
                stdout: captured.stdout.trim().to_string(),
                stderr: captured.stderr.trim().to_string(),
                launch_error: None,
            }
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(err = %reason, "command did not complete");
            CommandResult::launch_failure(command, reason)
        }
    }
}

struct Captured {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

fn run_captured(spec: &CommandSpec, timeout: Duration) -> Result<Captured> {
    let deadline = Instant::now() + timeout;
    let mut cmd = spec.to_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, program = spec.program(), "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {}", spec.program()));
        }
    };

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        _ => {
            reap(&mut child);
            bail!("stdout/stderr were not piped");
        }
    };

    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Stdout, stdout, tx.clone());
    spawn_reader(Stream::Stderr, stderr, tx);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            reap(&mut child);
            // Reader threads are left detached; a grandchild may still hold the pipes.
            bail!("timed out after {}s", timeout.as_secs());
        }
        Err(e) => {
            reap(&mut child);
            return Err(e).context("wait for command");
        }
    };

    let (stdout, stderr) = collect_output(&rx, deadline, timeout)?;

    let exit_code = status
        .code()
        .ok_or_else(|| anyhow!("terminated by signal ({status})"))?;
    let stdout = String::from_utf8(stdout).context("decode stdout as utf-8")?;
    let stderr = String::from_utf8(stderr).context("decode stderr as utf-8")?;

    Ok(Captured {
        exit_code,
        stdout,
        stderr,
    })
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(err = %e, "kill failed (child may have exited)");
    }
    if let Err(e) = child.wait() {
        warn!(err = %e, "wait after kill failed");
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type StreamOutput = (Stream, Result<Vec<u8>>);

fn spawn_reader<R: Read + Send + 'static>(stream: Stream, reader: R, tx: Sender<StreamOutput>) {
    thread::spawn(move || {
        // The receiver is gone once the call has timed out.
        let _ = tx.send((stream, read_stream(reader)));
    });
}

/// Wait until both pipes reach EOF or `deadline` passes.
///
/// Reader threads still blocked at the deadline are left detached.
fn collect_output(
    rx: &Receiver<StreamOutput>,
    deadline: Instant,
    timeout: Duration,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = None;
    let mut stderr = None;
    while stdout.is_none() || stderr.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, output)) => stdout = Some(output.context("read stdout")?),
            Ok((Stream::Stderr, output)) => stderr = Some(output.context("read stderr")?),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "output still open after child exit"
                );
                bail!(
                    "timed out after {}s waiting for output to close",
                    timeout.as_secs()
                );
            }
            Err(RecvTimeoutError::Disconnected) => bail!("output reader thread panicked"),
        }
    }
    Ok((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
}

fn read_stream<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).context("read output")?;
    Ok(buf)
}
