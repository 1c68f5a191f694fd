//! Telegram chat adapter for the server console.

pub mod bot;
pub mod commands;

pub use bot::run_bot;
pub use commands::{BotCommand, parse_message};
