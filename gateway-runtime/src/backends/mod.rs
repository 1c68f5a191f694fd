//! Execution backends: four interchangeable executors behind one interface.
//!
//! Backends receive the payload plus a dispatch-time snapshot of the session
//! state and return raw process output. Timeout enforcement lives in
//! `run_command`: every child is spawned in its own process group, and a
//! timed-out command's whole group is killed, so nothing the command forked
//! survives it.

pub mod eval;
pub mod foreign;
pub mod shell;
pub mod upload;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{GatewayError, Result};
use crate::gateway::Payload;

pub use eval::EvalBackend;
pub use foreign::ForeignBackend;
pub use shell::ShellBackend;
pub use upload::UploadBackend;

/// Session state and limits captured once at dispatch time.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    /// Wall-clock limit for the spawned process.
    pub timeout: Duration,
}

/// Raw process output before gateway normalization.
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn run(&self, payload: &Payload, ctx: &ExecContext) -> Result<RawOutput>;
}

/// Spawn `command`, optionally feed `stdin`, and collect its output within
/// `timeout`.
///
/// A missing program surfaces as `RuntimeNotFound(runtime)` so adapters can
/// tell "interpreter not installed" apart from a generic execution failure.
/// The child leads its own process group; on timeout the whole group is
/// killed, so shell pipelines and forked grandchildren go down with it.
pub(crate) async fn run_command(
    mut command: Command,
    stdin: Option<&[u8]>,
    runtime: &str,
    timeout: Duration,
) -> Result<RawOutput> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            GatewayError::RuntimeNotFound(runtime.to_string())
        } else {
            GatewayError::BackendFault(format!("SpawnError: {err}"))
        }
    })?;
    // pid == pgid after process_group(0).
    let pid = child.id();

    let stdin = stdin.map(<[u8]>::to_vec);
    let pipe = child.stdin.take();
    let wait = async move {
        if let (Some(bytes), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(&bytes)
                .await
                .map_err(|err| GatewayError::BackendFault(format!("IoError: {err}")))?;
            // Close the pipe so the child sees EOF.
            drop(pipe);
        }
        child
            .wait_with_output()
            .await
            .map_err(|err| GatewayError::BackendFault(format!("IoError: {err}")))
    };

    let output = match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result?,
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid as i32);
            }
            return Err(GatewayError::Timeout);
        }
    };

    Ok(RawOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

/// Send SIGKILL to the whole process group led by `pid`.
fn kill_process_group(pid: i32) {
    // Negative pid addresses every process in the group.
    // SAFETY: kill(2) with a valid signal number.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc == -1 {
        let errno = std::io::Error::last_os_error();
        // ESRCH means the group already exited.
        if errno.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("SIGKILL to process group {pid} failed: {errno}");
        }
    }
}

/// Base command with the session's working directory and environment applied.
pub(crate) fn command_in_context(program: &str, ctx: &ExecContext) -> Command {
    let mut command = Command::new(program);
    command.current_dir(&ctx.cwd).env_clear().envs(&ctx.env);
    command
}

#[cfg(test)]
pub(crate) fn test_context() -> ExecContext {
    ExecContext {
        cwd: std::env::temp_dir(),
        env: std::env::vars().collect(),
        timeout: Duration::from_secs(30),
    }
}
