use std::fmt;

/// Errors returned by gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Caller identity does not match the configured admin identity.
    Unauthorized,
    /// Backend exceeded the wall-clock execution limit.
    Timeout,
    /// Directory-change target is not a directory.
    NotADirectory(String),
    /// Directory-change target exists but cannot be read.
    NotReadable(String),
    /// Uploaded file has an unsupported extension.
    UnsupportedFileType(String),
    /// A required language runtime is missing from the host.
    RuntimeNotFound(String),
    /// Request payload does not match the operation or cannot be parsed.
    MalformedPayload(String),
    /// Any fault raised inside a backend, carrying kind and message.
    BackendFault(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Adapters and callers match on these two exact strings.
            GatewayError::Unauthorized => write!(f, "Unauthorized"),
            GatewayError::Timeout => write!(f, "Timeout"),
            GatewayError::NotADirectory(path) => write!(f, "not a directory: {path}"),
            GatewayError::NotReadable(path) => write!(f, "not readable: {path}"),
            GatewayError::UnsupportedFileType(name) => {
                write!(f, "unsupported file type: {name}")
            }
            GatewayError::RuntimeNotFound(runtime) => {
                write!(f, "runtime not found: {runtime}")
            }
            GatewayError::MalformedPayload(msg) => write!(f, "malformed payload: {msg}"),
            GatewayError::BackendFault(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Convert GatewayError to String for adapter-facing result fields.
impl From<GatewayError> for String {
    fn from(err: GatewayError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_and_timeout_display_exact_strings() {
        assert_eq!(GatewayError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(GatewayError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn backend_fault_displays_message_verbatim() {
        let err = GatewayError::BackendFault("TypeError: bad operand".into());
        assert_eq!(err.to_string(), "TypeError: bad operand");
    }
}
