//! Foreign-language backend: runs a fragment under the Node.js runtime with
//! the session's working directory and environment.

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::gateway::Payload;

use super::{Backend, ExecContext, RawOutput, command_in_context, run_command};

pub const NODE_RUNTIME: &str = "node";

pub struct ForeignBackend;

#[async_trait]
impl Backend for ForeignBackend {
    async fn run(&self, payload: &Payload, ctx: &ExecContext) -> Result<RawOutput> {
        let Payload::Code(code) = payload else {
            return Err(GatewayError::MalformedPayload(
                "foreign backend expects a code string".into(),
            ));
        };

        let mut process = command_in_context(NODE_RUNTIME, ctx);
        process.arg("-e").arg(code);
        run_command(process, None, NODE_RUNTIME, ctx.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_context;

    // Node may be absent on the test host; a missing runtime must surface as
    // the distinct RuntimeNotFound error, which these tests accept.
    #[tokio::test]
    async fn runs_code_or_reports_missing_runtime() {
        let result = ForeignBackend
            .run(&Payload::Code("console.log(6 * 7)".into()), &test_context())
            .await;
        match result {
            Ok(out) => assert_eq!(out.stdout.trim(), "42"),
            Err(GatewayError::RuntimeNotFound(runtime)) => assert_eq!(runtime, NODE_RUNTIME),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn wrong_payload_kind_is_malformed() {
        let err = ForeignBackend
            .run(&Payload::Command("ls".into()), &test_context())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedPayload(_)));
    }
}
