//! Uploaded-file backend: persist bytes to a scoped temp file and run them
//! under the Python interpreter.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::gateway::Payload;

use super::eval::PYTHON_RUNTIME;
use super::{Backend, ExecContext, RawOutput, command_in_context, run_command};

pub struct UploadBackend;

fn require_python_extension(name: &str) -> Result<()> {
    let ok = Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(GatewayError::UnsupportedFileType(name.to_string()))
    }
}

#[async_trait]
impl Backend for UploadBackend {
    async fn run(&self, payload: &Payload, ctx: &ExecContext) -> Result<RawOutput> {
        let Payload::File { name, bytes } = payload else {
            return Err(GatewayError::MalformedPayload(
                "upload backend expects file bytes".into(),
            ));
        };

        // Gate on the extension before anything touches the filesystem.
        require_python_extension(name)?;

        let mut file = tempfile::Builder::new()
            .prefix("console-upload-")
            .suffix(".py")
            .tempfile()
            .map_err(|err| GatewayError::BackendFault(format!("IoError: {err}")))?;
        file.write_all(bytes)
            .map_err(|err| GatewayError::BackendFault(format!("IoError: {err}")))?;
        file.flush()
            .map_err(|err| GatewayError::BackendFault(format!("IoError: {err}")))?;

        // Uploaded scripts run with the session context, same as shell and
        // foreign execution.
        let mut process = command_in_context(PYTHON_RUNTIME, ctx);
        process.arg(file.path());
        let result = run_command(process, None, PYTHON_RUNTIME, ctx.timeout).await;

        // Best-effort deletion; a failure is logged, never surfaced.
        if let Err(err) = file.close() {
            tracing::warn!("failed to remove uploaded temp file: {err}");
        }

        result
    }
}
