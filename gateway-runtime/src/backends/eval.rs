//! Python eval backend.
//!
//! The code fragment is fed over stdin to an embedded driver running under
//! `python3 -c`. The driver decides asynchrony by parsing the fragment into a
//! syntax tree and looking for async node kinds; a substring check is the
//! fallback only when parsing itself fails (e.g. bare top-level `await`,
//! which is a syntax error in module mode). Async fragments are wrapped in an
//! anonymous coroutine and awaited; everything else is tried as a single
//! expression first, then executed as statements. All stdout produced during
//! evaluation is captured and returned, with dict/list results rendered as
//! indented JSON and a best-effort cosmetic pass that canonicalizes output
//! that is itself a single dict/list literal.

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::gateway::Payload;

use super::{Backend, ExecContext, RawOutput, command_in_context, run_command};

pub const PYTHON_RUNTIME: &str = "python3";

/// Driver executed as `python3 -c`. Faults are written to stderr as
/// `<kind>: <message>` followed by the traceback, with exit code 1.
const EVAL_DRIVER: &str = r##"
import ast, asyncio, io, json, sys, traceback

def detect_async(code):
    try:
        tree = ast.parse(code)
    except SyntaxError:
        return any(token in code for token in ("await ", "async "))
    for node in ast.walk(tree):
        if isinstance(node, (ast.Await, ast.AsyncFunctionDef, ast.AsyncFor, ast.AsyncWith)):
            return True
    return False

def render(value):
    if isinstance(value, (dict, list, tuple)):
        try:
            return json.dumps(value, indent=2, default=str)
        except (TypeError, ValueError):
            return repr(value)
    return str(value)

def normalize(text):
    stripped = text.strip()
    if not stripped or stripped[0] not in "[{" or stripped[-1] not in "]}":
        return text
    try:
        literal = ast.literal_eval(stripped)
    except (ValueError, SyntaxError, MemoryError, RecursionError):
        return text
    if not isinstance(literal, (dict, list)):
        return text
    try:
        return json.dumps(literal, indent=2, default=str)
    except (TypeError, ValueError):
        return text

def evaluate(code, namespace):
    if detect_async(code):
        body = "\n".join("    " + line for line in code.splitlines())
        wrapper = "async def __console_eval__():\n" + body
        exec(compile(wrapper, "<eval>", "exec"), namespace)
        return asyncio.run(namespace["__console_eval__"]())
    try:
        compiled = compile(code, "<eval>", "eval")
    except SyntaxError:
        exec(compile(code, "<eval>", "exec"), namespace)
        return None
    return eval(compiled, namespace)

def main():
    code = sys.stdin.read()
    namespace = {"__builtins__": __builtins__}
    buffer = io.StringIO()
    real_stdout = sys.stdout
    sys.stdout = buffer
    try:
        value = evaluate(code, namespace)
        if value is not None:
            buffer.write(render(value))
    except BaseException as exc:
        sys.stdout = real_stdout
        kind = type(exc).__name__
        sys.stderr.write("%s: %s\n%s" % (kind, exc, traceback.format_exc()))
        sys.exit(1)
    finally:
        sys.stdout = real_stdout
    sys.stdout.write(normalize(buffer.getvalue()))

main()
"##;

pub struct EvalBackend;

#[async_trait]
impl Backend for EvalBackend {
    async fn run(&self, payload: &Payload, ctx: &ExecContext) -> Result<RawOutput> {
        let Payload::Code(code) = payload else {
            return Err(GatewayError::MalformedPayload(
                "eval backend expects a code string".into(),
            ));
        };

        let mut process = command_in_context(PYTHON_RUNTIME, ctx);
        process.arg("-c").arg(EVAL_DRIVER);
        let output = run_command(process, Some(code.as_bytes()), PYTHON_RUNTIME, ctx.timeout).await?;

        // A non-zero exit means the driver caught a fault; stderr already
        // carries "<kind>: <message>\n<trace>".
        if output.exit_code != Some(0) {
            return Err(GatewayError::BackendFault(
                output.stderr.trim_end().to_string(),
            ));
        }

        Ok(output)
    }
}
