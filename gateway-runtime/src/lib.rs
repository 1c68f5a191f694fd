//! Session-scoped command execution gateway.
//!
//! This crate provides the core session state, authorization policy,
//! execution backends, gateway orchestration, and web console API that are
//! shared by the chat and HTTP front ends.

pub mod auth;
pub mod backends;
pub mod config;
pub mod console_api;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod session;
pub mod util;

pub use auth::AuthPolicy;
pub use config::ConsoleConfig;
pub use error::GatewayError;
pub use gateway::{
    EXECUTION_TIMEOUT, ExecutionRequest, ExecutionResult, Gateway, NO_OUTPUT, Operation, Payload,
};
pub use session::SessionHandle;

pub const DEFAULT_CONSOLE_PORT: u16 = 7860;
