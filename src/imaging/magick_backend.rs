//! ImageMagick CLI backend and tool discovery.
//!
//! ## Discovery
//!
//! [`detect`] looks for `convert` (or `convert.exe`) inside the configured
//! ImageMagick directory and returns a [`ToolSupport`] value. It is meant to
//! run once per process; callers keep the value and hand it to whatever
//! needs to know where the tool lives.
//!
//! ## Execution
//!
//! | Plan | Processes |
//! |---|---|
//! | `Single` | one `convert`, stdout/stderr captured |
//! | `Piped` | producer stdout → consumer stdin, producer stderr drained on a thread |

use super::TransformError;
use super::assembler::{CommandPlan, Invocation};
use super::backend::{BackendError, ExecOutput, ToolBackend};
use std::io::Read;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

const EXECUTABLE: &str = "convert";

/// Whether ImageMagick can be used, and where `convert` is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSupport {
    /// No ImageMagick directory configured.
    Unconfigured,
    /// Directory configured but `convert` is not in it.
    MissingExecutable(PathBuf),
    Available { convert: PathBuf },
}

impl ToolSupport {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Path to `convert`, or the reason there is none.
    pub fn require(&self) -> Result<&Path, TransformError> {
        match self {
            Self::Available { convert } => Ok(convert),
            Self::Unconfigured => Err(TransformError::ToolUnavailable(
                "no ImageMagick path configured".into(),
            )),
            Self::MissingExecutable(dir) => Err(TransformError::ToolUnavailable(format!(
                "missing executable: {EXECUTABLE} in {}",
                dir.display()
            ))),
        }
    }
}

/// Normalize a directory to the host separator with exactly one trailing
/// separator.
pub fn shell_dir(path: &str) -> String {
    let mut normalized = if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    };
    while normalized.len() > 1 && normalized.ends_with(MAIN_SEPARATOR) {
        normalized.pop();
    }
    if !normalized.ends_with(MAIN_SEPARATOR) {
        normalized.push(MAIN_SEPARATOR);
    }
    normalized
}

/// Find `convert` inside `imagemagick_dir`.
pub fn detect(imagemagick_dir: Option<&Path>) -> ToolSupport {
    let Some(dir) = imagemagick_dir.filter(|d| !d.as_os_str().is_empty()) else {
        return ToolSupport::Unconfigured;
    };
    let dir = PathBuf::from(shell_dir(&dir.to_string_lossy()));

    for name in [EXECUTABLE.to_string(), format!("{EXECUTABLE}.exe")] {
        let candidate = dir.join(&name);
        if candidate.is_file() {
            debug!(convert = %candidate.display(), "ImageMagick found");
            return ToolSupport::Available { convert: candidate };
        }
    }

    warn!(dir = %dir.display(), "missing executable: {EXECUTABLE}");
    ToolSupport::MissingExecutable(dir)
}

/// Runs command plans through the ImageMagick CLI.
pub struct MagickCliBackend;

impl MagickCliBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MagickCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn command_for(invocation: &Invocation) -> Command {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);
    command
}

fn spawn_error(invocation: &Invocation, source: std::io::Error) -> BackendError {
    BackendError::Spawn {
        program: invocation.program.display().to_string(),
        source,
    }
}

fn to_exec_output(output: Output) -> ExecOutput {
    ExecOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

fn run_single(invocation: &Invocation) -> Result<ExecOutput, BackendError> {
    let output = command_for(invocation)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(invocation, e))?;
    Ok(to_exec_output(output))
}

/// Read a child's stderr to the end on its own thread. The producer must
/// never stall on a full stderr pipe while the consumer is still reading.
fn drain(stderr: Option<ChildStderr>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stderr {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}

/// Stop the producer after the consumer went away.
fn abandon(mut child: Child, stderr: JoinHandle<Vec<u8>>) {
    let _ = child.kill();
    let _ = child.wait();
    let _ = stderr.join();
}

fn run_piped(producer: &Invocation, consumer: &Invocation) -> Result<ExecOutput, BackendError> {
    let mut first = command_for(producer)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(producer, e))?;
    let first_stderr = drain(first.stderr.take());

    let Some(pipe) = first.stdout.take() else {
        abandon(first, first_stderr);
        return Err(BackendError::Io(std::io::Error::other(
            "producer stdout was not captured",
        )));
    };

    let second = command_for(consumer)
        .stdin(Stdio::from(pipe))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let second = match second {
        Ok(child) => child,
        Err(e) => {
            abandon(first, first_stderr);
            return Err(spawn_error(consumer, e));
        }
    };

    let consumer_output = match second.wait_with_output() {
        Ok(output) => to_exec_output(output),
        Err(e) => {
            abandon(first, first_stderr);
            return Err(e.into());
        }
    };
    let producer_status = first.wait()?.code();
    let producer_stderr = first_stderr.join().unwrap_or_default();
    let producer_stderr = String::from_utf8_lossy(&producer_stderr).into_owned();

    let status = if producer_status == Some(0) {
        consumer_output.status
    } else {
        producer_status
    };
    let stderr = [producer_stderr, consumer_output.stderr]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ExecOutput {
        status,
        stdout: consumer_output.stdout,
        stderr,
    })
}

impl ToolBackend for MagickCliBackend {
    fn run(&self, command: &CommandPlan) -> Result<ExecOutput, BackendError> {
        debug!(command = %command.shell_line(), "running ImageMagick");
        let output = match command {
            CommandPlan::Single(invocation) => run_single(invocation)?,
            CommandPlan::Piped { producer, consumer } => run_piped(producer, consumer)?,
        };
        if !output.success() {
            warn!(status = ?output.status, stderr = %output.stderr.trim(), "ImageMagick failed");
        }
        Ok(output)
    }
}
