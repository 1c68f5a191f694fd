//! Execution gateway: one authorization + session + timeout contract over
//! the four backends.
//!
//! Algorithm per call: authorize → intercept directory changes → snapshot
//! session state → dispatch to the backend → bound by the wall-clock timeout
//! → normalize output. Every backend error becomes a structured result; no
//! fault propagates to an adapter.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::auth::AuthPolicy;
use crate::backends::{
    Backend, EvalBackend, ExecContext, ForeignBackend, RawOutput, ShellBackend, UploadBackend,
};
use crate::error::{GatewayError, Result};
use crate::metrics::metrics;
use crate::session::SessionHandle;
use crate::util::expand_home;

/// Hard wall-clock limit for a single backend invocation.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Canned output for a successful run that produced nothing on either stream.
pub const NO_OUTPUT: &str = "Executed successfully, no output";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ShellCommand,
    EvalCode,
    RunUploadedFile,
    RunForeignCode,
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// Shell command line.
    Command(String),
    /// Code fragment (Python for eval, JavaScript for the foreign runtime).
    Code(String),
    /// Uploaded file bytes with the declared file name.
    File { name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub operation: Operation,
    pub payload: Payload,
    pub identity: String,
}

/// Structured result returned to every adapter, serialized as the uniform
/// HTTP envelope (`exitCode` camelCase on the wire).
///
/// `error` keeps the typed `GatewayError` so callers can branch on the kind;
/// it serializes as the rendered message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_error")]
    pub error: Option<GatewayError>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<GatewayError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ExecutionResult {
    fn info(output: String) -> Self {
        Self {
            success: true,
            output,
            exit_code: None,
            error: None,
        }
    }

    fn failure(err: GatewayError) -> Self {
        Self {
            success: false,
            output: String::new(),
            exit_code: None,
            error: Some(err),
        }
    }

    /// Normalize raw process output: stdout wins if non-empty, else stderr,
    /// else the canned no-output string. Streams are never concatenated.
    fn from_raw(raw: RawOutput) -> Self {
        let output = if !raw.stdout.is_empty() {
            raw.stdout
        } else if !raw.stderr.is_empty() {
            raw.stderr
        } else {
            NO_OUTPUT.to_string()
        };
        Self {
            success: true,
            output,
            exit_code: raw.exit_code,
            error: None,
        }
    }
}

struct Backends {
    shell: Arc<dyn Backend>,
    eval: Arc<dyn Backend>,
    upload: Arc<dyn Backend>,
    foreign: Arc<dyn Backend>,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            shell: Arc::new(ShellBackend),
            eval: Arc::new(EvalBackend),
            upload: Arc::new(UploadBackend),
            foreign: Arc::new(ForeignBackend),
        }
    }
}

pub struct Gateway {
    policy: AuthPolicy,
    session: SessionHandle,
    timeout: Duration,
    backends: Backends,
}

impl Gateway {
    /// Gateway with the process-derived session and production timeout.
    pub fn new(policy: AuthPolicy) -> Self {
        Self::with_session(policy, SessionHandle::from_process())
    }

    pub fn with_session(policy: AuthPolicy, session: SessionHandle) -> Self {
        Self {
            policy,
            session,
            timeout: EXECUTION_TIMEOUT,
            backends: Backends::default(),
        }
    }

    /// Override the execution timeout (tests shorten it).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the backend for one operation (tests inject spies).
    pub fn with_backend(mut self, operation: Operation, backend: Arc<dyn Backend>) -> Self {
        match operation {
            Operation::ShellCommand => self.backends.shell = backend,
            Operation::EvalCode => self.backends.eval = backend,
            Operation::RunUploadedFile => self.backends.upload = backend,
            Operation::RunForeignCode => self.backends.foreign = backend,
        }
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Check an identity against the configured policy without executing
    /// anything. Adapters use this for read-only surfaces.
    pub fn authorize(&self, identity: &str) -> Result<()> {
        self.policy.authorize(identity)
    }

    pub async fn current_dir(&self) -> std::path::PathBuf {
        self.session.current_dir().await
    }

    /// Execute one request. Always returns a structured result.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let _guard = metrics().in_flight_guard();
        match self.try_execute(&request).await {
            Ok(result) => result,
            Err(err) => {
                if matches!(err, GatewayError::Unauthorized) {
                    metrics().record_denied();
                    tracing::warn!(identity = %request.identity, "unauthorized request denied");
                } else {
                    metrics().record_failure();
                    tracing::warn!(error = %err, "execution failed");
                }
                ExecutionResult::failure(err)
            }
        }
    }

    async fn try_execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.policy.authorize(&request.identity)?;

        if request.operation == Operation::ShellCommand {
            if let Payload::Command(command) = &request.payload {
                if let Some(target) = change_dir_target(command) {
                    let resolved = self.change_dir(target).await?;
                    metrics().record_call(Operation::ShellCommand);
                    return Ok(ExecutionResult::info(format!(
                        "Changed directory to {}",
                        resolved.display()
                    )));
                }
            }
        }

        let backend = self.backend_for(request.operation);
        let (cwd, env) = self.session.snapshot().await;
        let ctx = ExecContext {
            cwd,
            env,
            timeout: self.timeout,
        };

        // Timeout enforcement (including process-group kill) happens inside
        // the backend's process runner.
        let raw = backend.run(&request.payload, &ctx).await?;

        metrics().record_call(request.operation);
        Ok(ExecutionResult::from_raw(raw))
    }

    fn backend_for(&self, operation: Operation) -> Arc<dyn Backend> {
        match operation {
            Operation::ShellCommand => self.backends.shell.clone(),
            Operation::EvalCode => self.backends.eval.clone(),
            Operation::RunUploadedFile => self.backends.upload.clone(),
            Operation::RunForeignCode => self.backends.foreign.clone(),
        }
    }

    /// Resolve and apply a directory change. Never spawns a subprocess.
    async fn change_dir(&self, target: Option<&str>) -> Result<std::path::PathBuf> {
        let path = match target {
            None => dirs::home_dir()
                .ok_or_else(|| GatewayError::NotADirectory("~ (no home directory)".into()))?,
            Some(arg) => {
                let expanded = expand_home(arg);
                if expanded.is_absolute() {
                    expanded
                } else {
                    self.session.current_dir().await.join(expanded)
                }
            }
        };
        self.session.set_dir(&path).await
    }
}

/// Lexical directory-change detection: the trimmed command is `cd` alone or
/// `cd` followed by whitespace and a target.
fn change_dir_target(command: &str) -> Option<Option<&str>> {
    let trimmed = command.trim();
    if trimmed == "cd" {
        return Some(None);
    }
    let rest = trimmed.strip_prefix("cd")?;
    if rest.starts_with(char::is_whitespace) {
        let arg = rest.trim();
        if arg.is_empty() {
            Some(None)
        } else {
            Some(Some(arg))
        }
    } else {
        None
    }
}

/// Convenience constructors used by both adapters.
impl ExecutionRequest {
    pub fn shell(command: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            operation: Operation::ShellCommand,
            payload: Payload::Command(command.into()),
            identity: identity.into(),
        }
    }

    pub fn eval(code: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            operation: Operation::EvalCode,
            payload: Payload::Code(code.into()),
            identity: identity.into(),
        }
    }

    pub fn upload(
        name: impl Into<String>,
        bytes: Vec<u8>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            operation: Operation::RunUploadedFile,
            payload: Payload::File {
                name: name.into(),
                bytes,
            },
            identity: identity.into(),
        }
    }

    pub fn foreign(code: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            operation: Operation::RunForeignCode,
            payload: Payload::Code(code.into()),
            identity: identity.into(),
        }
    }
}
