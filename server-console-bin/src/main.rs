//! Server console runner.
//!
//! Starts the web console unconditionally; the Telegram bot starts only when
//! both a bot token and an admin chat id are configured. A missing or
//! partial configuration degrades to web-console-only with deny-all
//! authorization — it never crashes the process.

use std::sync::Arc;

use gateway_runtime::console_api::console_router;
use gateway_runtime::{AuthPolicy, ConsoleConfig, Gateway};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    setup_log();

    let config = ConsoleConfig::load();
    let policy = config.auth_policy();
    match &policy {
        AuthPolicy::Admin(admin) => info!("authorization: single admin identity {admin}"),
        AuthPolicy::DenyAll => {
            warn!("no admin identity configured: all execution requests will be denied")
        }
        AuthPolicy::AllowAll => {
            warn!("INSECURE DEMO MODE: authorization disabled, every caller is accepted")
        }
    }

    let gateway = Arc::new(Gateway::new(policy));
    info!(
        "session starts in {}",
        gateway.current_dir().await.display()
    );

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = console_router(gateway.clone());
    info!("starting web console on {addr}");
    let server = tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, router).await {
                    error!("web console error: {err}");
                }
            }
            Err(err) => error!("failed to bind {addr}: {err}"),
        }
    });

    match (config.bot_token.clone(), admin_chat_id(&config)) {
        (Some(token), Some(admin)) => {
            info!("starting telegram bot for admin chat {admin}");
            server_console_lib::run_bot(token, admin, gateway).await;
        }
        (Some(_), None) => {
            warn!("bot token configured but admin_chat_id is missing or not numeric; bot disabled");
            wait_for_shutdown(server).await;
        }
        (None, _) => {
            info!("no bot token configured; running web console only");
            wait_for_shutdown(server).await;
        }
    }
}

fn admin_chat_id(config: &ConsoleConfig) -> Option<i64> {
    config
        .admin_chat_id
        .as_deref()
        .and_then(|id| id.trim().parse().ok())
}

async fn wait_for_shutdown(server: tokio::task::JoinHandle<()>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
        _ = server => {}
    }
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
