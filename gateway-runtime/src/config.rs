//! Console configuration.
//!
//! One TOML artifact (`console.toml` by default) holds the admin identity and
//! the bot credential. A missing or unreadable file never crashes the
//! process: the console degrades to deny-all authorization with the bot
//! disabled, leaving the web surface live.

use std::path::Path;

use serde::Deserialize;

use crate::auth::AuthPolicy;

fn default_port() -> u16 {
    7860
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConsoleConfig {
    /// Telegram chat id of the single admin. Replies and alerts go here.
    pub admin_chat_id: Option<String>,
    /// Telegram bot API token. Absent token disables the chat adapter.
    pub bot_token: Option<String>,
    /// Explicit opt-in to allow-all authorization when no admin is configured.
    #[serde(default)]
    pub insecure_demo: bool,
    /// Web console listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ConsoleConfig {
    /// Load configuration from `CONSOLE_CONFIG` (default `console.toml`),
    /// then apply environment overrides.
    pub fn load() -> Self {
        let path = std::env::var("CONSOLE_CONFIG").unwrap_or_else(|_| "console.toml".to_string());
        let mut config = Self::from_file(Path::new(&path)).unwrap_or_else(|| {
            tracing::warn!("config file '{path}' not found or invalid, using defaults");
            Self {
                port: default_port(),
                ..Self::default()
            }
        });

        if let Ok(admin) = std::env::var("CONSOLE_ADMIN_CHAT_ID") {
            config.admin_chat_id = Some(admin);
        }
        if let Ok(token) = std::env::var("CONSOLE_BOT_TOKEN") {
            config.bot_token = Some(token);
        }
        if let Ok(port) = std::env::var("CONSOLE_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(v) = std::env::var("CONSOLE_INSECURE_DEMO") {
            config.insecure_demo = v.eq_ignore_ascii_case("true") || v == "1";
        }

        config
    }

    pub fn from_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("failed to parse {}: {err}", path.display());
                None
            }
        }
    }

    /// Derive the authorization policy. Admin identity wins; otherwise the
    /// explicit insecure-demo flag selects allow-all, and the default is
    /// deny-all on every surface.
    pub fn auth_policy(&self) -> AuthPolicy {
        match (&self.admin_chat_id, self.insecure_demo) {
            (Some(admin), _) => AuthPolicy::Admin(admin.trim().to_string()),
            (None, true) => AuthPolicy::AllowAll,
            (None, false) => AuthPolicy::DenyAll,
        }
    }
}
