//! Authenticated caller identity.
//!
//! The core does NOT depend on any specific auth module. The server binary's
//! auth middleware validates the bearer credential and injects an [`Identity`]
//! into request extensions; handlers extract it with `Extension<Identity>`.
//! The identity is passed explicitly into every arbiter call — there is no
//! implicit ambient user.

use serde::{Deserialize, Serialize};

/// The authenticated caller, as established by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// User id (or "root" for the configured superadmin).
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Whether the user may perform administrative operations.
    pub admin: bool,
}

impl Identity {
    /// Require the admin flag, for administrative endpoints.
    pub fn require_admin(&self) -> Result<(), crate::ServiceError> {
        if self.admin {
            Ok(())
        } else {
            Err(crate::ServiceError::PermissionDenied(
                "administrator privileges required".into(),
            ))
        }
    }
}
