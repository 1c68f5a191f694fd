//! Shell backend: runs the payload as a full shell command line.

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::gateway::Payload;

use super::{Backend, ExecContext, RawOutput, command_in_context, run_command};

/// Runs command lines through `sh -c` so pipes, redirection, and the rest of
/// the shell syntax work; the payload is never exec'd as argv directly.
pub struct ShellBackend;

#[async_trait]
impl Backend for ShellBackend {
    async fn run(&self, payload: &Payload, ctx: &ExecContext) -> Result<RawOutput> {
        let Payload::Command(command) = payload else {
            return Err(GatewayError::MalformedPayload(
                "shell backend expects a command string".into(),
            ));
        };

        let mut process = command_in_context("sh", ctx);
        process.arg("-c").arg(command);
        run_command(process, None, "sh", ctx.timeout).await
    }
}
