//! Axum-based web console API.
//!
//! Provides REST endpoints for:
//! - Shell execution, Python eval, foreign-runtime eval
//! - Uploaded-file runs (multipart)
//! - Session directory and health/status queries
//!
//! Every response is the uniform `ExecutionResult` envelope; `Unauthorized`
//! maps to 401 and `MalformedPayload` to 400.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::GatewayError;
use crate::gateway::{ExecutionRequest, ExecutionResult, Gateway};
use crate::metrics::metrics;

const CONSOLE_PAGE: &str = include_str!("console.html");

type AppState = Arc<Gateway>;

fn envelope(result: ExecutionResult) -> (StatusCode, Json<ExecutionResult>) {
    // Status is derived from the error kind, never from its rendered text.
    let status = match &result.error {
        Some(GatewayError::Unauthorized) => StatusCode::UNAUTHORIZED,
        Some(GatewayError::MalformedPayload(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, Json(result))
}

fn error_envelope(err: GatewayError) -> (StatusCode, Json<ExecutionResult>) {
    envelope(ExecutionResult {
        success: false,
        output: String::new(),
        exit_code: None,
        error: Some(err),
    })
}

// ---------------------------------------------------------------------------
// Execution endpoints
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CommandBody {
    command: String,
    identity: String,
}

#[derive(Deserialize)]
struct CodeBody {
    code: String,
    identity: String,
}

async fn execute_shell(
    State(gateway): State<AppState>,
    Json(body): Json<CommandBody>,
) -> impl IntoResponse {
    envelope(
        gateway
            .execute(ExecutionRequest::shell(body.command, body.identity))
            .await,
    )
}

async fn evaluate_code(
    State(gateway): State<AppState>,
    Json(body): Json<CodeBody>,
) -> impl IntoResponse {
    envelope(
        gateway
            .execute(ExecutionRequest::eval(body.code, body.identity))
            .await,
    )
}

async fn run_foreign(
    State(gateway): State<AppState>,
    Json(body): Json<CodeBody>,
) -> impl IntoResponse {
    envelope(
        gateway
            .execute(ExecutionRequest::foreign(body.code, body.identity))
            .await,
    )
}

async fn run_uploaded(
    State(gateway): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut identity = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("identity") {
                    identity = field.text().await.unwrap_or_default();
                    continue;
                }
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .or_else(|| field.name().map(str::to_string))
                    .unwrap_or_default();
                match field.bytes().await {
                    Ok(bytes) => file = Some((name, bytes.to_vec())),
                    Err(err) => {
                        return error_envelope(GatewayError::MalformedPayload(format!(
                            "failed to read upload: {err}"
                        )));
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                return error_envelope(GatewayError::MalformedPayload(format!(
                    "invalid multipart body: {err}"
                )));
            }
        }
    }

    let Some((name, bytes)) = file else {
        return error_envelope(GatewayError::MalformedPayload(
            "missing file part".into(),
        ));
    };

    envelope(
        gateway
            .execute(ExecutionRequest::upload(name, bytes, identity))
            .await,
    )
}

// ---------------------------------------------------------------------------
// Session and status endpoints
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IdentityQuery {
    #[serde(default)]
    identity: String,
}

async fn current_dir(
    State(gateway): State<AppState>,
    Query(query): Query<IdentityQuery>,
) -> impl IntoResponse {
    if let Err(err) = gateway.authorize(&query.identity) {
        return error_envelope(err).into_response();
    }
    let cwd = gateway.current_dir().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({ "cwd": cwd.display().to_string() })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn status() -> impl IntoResponse {
    let counters: serde_json::Map<String, serde_json::Value> = metrics()
        .snapshot()
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::from(v)))
        .collect();
    Json(serde_json::json!({
        "status": "online",
        "service": "server-console",
        "counters": counters,
    }))
}

async fn index() -> impl IntoResponse {
    Html(CONSOLE_PAGE)
}

// ---------------------------------------------------------------------------
// Router builder
// ---------------------------------------------------------------------------

/// Build the web console router with all endpoints and CORS support.
pub fn console_router(gateway: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/cwd", get(current_dir))
        .route("/api/execute", post(execute_shell))
        .route("/api/eval", post(evaluate_code))
        .route("/api/node", post(run_foreign))
        .route("/api/upload", post(run_uploaded))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}
