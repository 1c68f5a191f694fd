//! End-to-end gateway tests: authorization, session-scoped execution,
//! directory changes, timeouts, and backend dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gateway_runtime::backends::{Backend, ExecContext, RawOutput};
use gateway_runtime::error::Result;
use gateway_runtime::{
    AuthPolicy, ExecutionRequest, Gateway, GatewayError, NO_OUTPUT, Operation, Payload,
    SessionHandle,
};

const ADMIN: &str = "424242";

fn admin_gateway() -> Gateway {
    let session = SessionHandle::new(
        std::env::temp_dir().canonicalize().unwrap(),
        std::env::vars().collect(),
    );
    Gateway::with_session(AuthPolicy::Admin(ADMIN.into()), session)
}

/// Records whether it was ever invoked; used to prove denied requests never
/// reach a backend.
struct SpyBackend {
    invoked: Arc<AtomicBool>,
}

#[async_trait]
impl Backend for SpyBackend {
    async fn run(&self, _payload: &Payload, _ctx: &ExecContext) -> Result<RawOutput> {
        self.invoked.store(true, Ordering::SeqCst);
        Ok(RawOutput::default())
    }
}

#[tokio::test]
async fn pwd_on_fresh_session_returns_initial_directory() {
    let gateway = admin_gateway();
    let initial = gateway.current_dir().await;
    let result = gateway.execute(ExecutionRequest::shell("pwd", ADMIN)).await;
    assert!(result.success);
    assert_eq!(result.output.trim(), initial.to_string_lossy());
    assert_eq!(result.exit_code, Some(0));
}

#[tokio::test]
async fn cd_is_observed_by_following_commands() {
    let gateway = admin_gateway();
    let target = tempfile::tempdir().unwrap();
    let resolved = target.path().canonicalize().unwrap();

    let result = gateway
        .execute(ExecutionRequest::shell(
            format!("cd {}", target.path().display()),
            ADMIN,
        ))
        .await;
    assert!(result.success, "cd failed: {:?}", result.error);
    assert!(result.output.contains(&resolved.display().to_string()));

    let result = gateway.execute(ExecutionRequest::shell("pwd", ADMIN)).await;
    assert_eq!(result.output.trim(), resolved.to_string_lossy());
}

#[tokio::test]
async fn cd_resolves_relative_and_parent_paths() {
    let gateway = admin_gateway();
    let base = tempfile::tempdir().unwrap();
    let nested = base.path().join("nested");
    std::fs::create_dir(&nested).unwrap();

    gateway
        .execute(ExecutionRequest::shell(
            format!("cd {}", base.path().display()),
            ADMIN,
        ))
        .await;
    let result = gateway
        .execute(ExecutionRequest::shell("cd nested", ADMIN))
        .await;
    assert!(result.success);
    assert_eq!(
        gateway.current_dir().await,
        nested.canonicalize().unwrap()
    );

    // `..` canonicalizes back to the base.
    let result = gateway.execute(ExecutionRequest::shell("cd ..", ADMIN)).await;
    assert!(result.success);
    assert_eq!(
        gateway.current_dir().await,
        base.path().canonicalize().unwrap()
    );
}

#[tokio::test]
async fn cd_to_invalid_target_leaves_session_unchanged() {
    let gateway = admin_gateway();
    let before = gateway.current_dir().await;

    let result = gateway
        .execute(ExecutionRequest::shell("cd /definitely/not/here", ADMIN))
        .await;
    assert!(!result.success);
    assert!(matches!(result.error, Some(GatewayError::NotADirectory(_))));
    assert_eq!(gateway.current_dir().await, before);
}

#[tokio::test]
async fn cd_alone_goes_home() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let gateway = admin_gateway();
    let result = gateway.execute(ExecutionRequest::shell("cd", ADMIN)).await;
    assert!(result.success);
    assert_eq!(gateway.current_dir().await, home.canonicalize().unwrap());
}

#[tokio::test]
async fn denied_identity_never_reaches_a_backend() {
    let invoked = Arc::new(AtomicBool::new(false));
    let gateway = admin_gateway().with_backend(
        Operation::ShellCommand,
        Arc::new(SpyBackend {
            invoked: invoked.clone(),
        }),
    );

    let result = gateway
        .execute(ExecutionRequest::shell("echo pwned", "999999"))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(GatewayError::Unauthorized));
    assert!(!invoked.load(Ordering::SeqCst), "backend was invoked");
}

#[tokio::test]
async fn denied_identity_is_rejected_for_every_operation() {
    let gateway = admin_gateway();
    let requests = vec![
        ExecutionRequest::shell("echo hi", "intruder"),
        ExecutionRequest::eval("2 + 2", "intruder"),
        ExecutionRequest::upload("x.py", b"print(1)".to_vec(), "intruder"),
        ExecutionRequest::foreign("console.log(1)", "intruder"),
    ];
    for request in requests {
        let result = gateway.execute(request).await;
        assert!(!result.success);
        assert_eq!(result.error, Some(GatewayError::Unauthorized));
    }
}

#[tokio::test]
async fn eval_is_idempotent_across_session_mutations() {
    let gateway = admin_gateway();

    let first = gateway.execute(ExecutionRequest::eval("2 + 2", ADMIN)).await;
    assert!(first.success, "eval failed: {:?}", first.error);
    assert!(first.output.contains('4'));

    // Mutate the session between the two calls.
    let dir = tempfile::tempdir().unwrap();
    gateway
        .execute(ExecutionRequest::shell(
            format!("cd {}", dir.path().display()),
            ADMIN,
        ))
        .await;

    let second = gateway.execute(ExecutionRequest::eval("2 + 2", ADMIN)).await;
    assert!(second.success);
    assert!(second.output.contains('4'));
}

#[tokio::test]
async fn file_round_trip_through_session_directory() {
    let gateway = admin_gateway();
    let dir = tempfile::tempdir().unwrap();
    gateway
        .execute(ExecutionRequest::shell(
            format!("cd {}", dir.path().display()),
            ADMIN,
        ))
        .await;

    let content = "line one\nline two";
    let write = gateway
        .execute(ExecutionRequest::shell(
            format!("printf '{content}' > roundtrip.txt"),
            ADMIN,
        ))
        .await;
    assert!(write.success);
    assert_eq!(write.output, NO_OUTPUT);

    let read = gateway
        .execute(ExecutionRequest::shell("cat roundtrip.txt", ADMIN))
        .await;
    assert_eq!(read.output, content);

    // The file really lives in the resolved session directory.
    let on_disk = std::fs::read_to_string(dir.path().join("roundtrip.txt")).unwrap();
    assert_eq!(on_disk, content);
}

#[tokio::test]
async fn long_running_command_times_out() {
    let gateway = admin_gateway().with_timeout(Duration::from_millis(200));
    let result = gateway
        .execute(ExecutionRequest::shell("sleep 5", ADMIN))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(GatewayError::Timeout));
}

#[tokio::test]
async fn timeout_leaves_no_processes_from_the_command() {
    let gateway = admin_gateway().with_timeout(Duration::from_millis(300));
    // Unique sleep argument so a /proc scan can identify survivors of this
    // exact command, forked children included.
    let marker = format!("7654.{}", std::process::id());
    let result = gateway
        .execute(ExecutionRequest::shell(
            format!("sleep {marker} & sleep {marker}; echo done"),
            ADMIN,
        ))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(GatewayError::Timeout));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let survivors = processes_with_arg(&marker);
    assert!(survivors.is_empty(), "still running: {survivors:?}");
}

fn processes_with_arg(marker: &str) -> Vec<String> {
    let mut hits = Vec::new();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return hits;
    };
    for entry in entries.flatten() {
        if let Ok(raw) = std::fs::read(entry.path().join("cmdline")) {
            let cmdline = String::from_utf8_lossy(&raw).replace('\0', " ");
            if cmdline.contains(marker) {
                hits.push(cmdline);
            }
        }
    }
    hits
}

#[tokio::test]
async fn eval_printed_dict_is_canonical_json() {
    let gateway = admin_gateway();
    let result = gateway
        .execute(ExecutionRequest::eval(
            "result = {'a':1,'b':2}\nprint(result)",
            ADMIN,
        ))
        .await;
    assert!(result.success, "eval failed: {:?}", result.error);
    let parsed: serde_json::Value = serde_json::from_str(result.output.trim()).unwrap();
    assert_eq!(parsed, serde_json::json!({ "a": 1, "b": 2 }));
    assert!(result.output.contains("\"a\": 1"), "not indented: {}", result.output);
}

#[tokio::test]
async fn upload_with_wrong_extension_fails_cleanly() {
    let gateway = admin_gateway();
    let result = gateway
        .execute(ExecutionRequest::upload(
            "payload.exe",
            b"whatever".to_vec(),
            ADMIN,
        ))
        .await;
    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(GatewayError::UnsupportedFileType(_))
    ));
}

#[tokio::test]
async fn uploaded_script_runs_in_session_directory() {
    let gateway = admin_gateway();
    let dir = tempfile::tempdir().unwrap();
    gateway
        .execute(ExecutionRequest::shell(
            format!("cd {}", dir.path().display()),
            ADMIN,
        ))
        .await;

    let result = gateway
        .execute(ExecutionRequest::upload(
            "whereami.py",
            b"import os\nprint(os.getcwd())".to_vec(),
            ADMIN,
        ))
        .await;
    assert!(result.success, "upload run failed: {:?}", result.error);
    assert_eq!(
        result.output.trim(),
        dir.path().canonicalize().unwrap().to_string_lossy()
    );
}

#[tokio::test]
async fn eval_fault_is_reported_not_propagated() {
    let gateway = admin_gateway();
    let result = gateway
        .execute(ExecutionRequest::eval("unknown_name", ADMIN))
        .await;
    assert!(!result.success);
    let Some(GatewayError::BackendFault(message)) = result.error else {
        panic!("expected a backend fault");
    };
    assert!(
        message.starts_with("NameError:"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn concurrent_shell_commands_share_one_snapshot_each() {
    let gateway = Arc::new(admin_gateway());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.execute(ExecutionRequest::shell("pwd", ADMIN)).await
        }));
    }
    let expected = gateway.current_dir().await;
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.success);
        assert_eq!(result.output.trim(), expected.to_string_lossy());
    }
}
