use crate::error::{GatewayError, Result};

/// Authorization policy for every gateway operation.
///
/// The no-config behavior is an explicit mode, not a silent fallback:
/// without an admin identity the policy is `DenyAll` unless the operator
/// opted into `AllowAll` (insecure demo mode) via configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Single admin identity; callers must match by string equality.
    Admin(String),
    /// Reject every caller (default when no admin is configured).
    DenyAll,
    /// Accept every caller. Demo mode only, logged loudly at startup.
    AllowAll,
}

impl AuthPolicy {
    pub fn authorize(&self, identity: &str) -> Result<()> {
        match self {
            AuthPolicy::Admin(admin) => {
                if identity.trim() == admin {
                    Ok(())
                } else {
                    Err(GatewayError::Unauthorized)
                }
            }
            AuthPolicy::DenyAll => Err(GatewayError::Unauthorized),
            AuthPolicy::AllowAll => Ok(()),
        }
    }
}
