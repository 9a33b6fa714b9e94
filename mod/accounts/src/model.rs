use serde::{Deserialize, Serialize};

/// A registered user account.
///
/// The stored record includes the argon2id password hash; responses use
/// [`UserView`], which omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub admin: bool,
    pub created_at: String,
}

/// Response projection of a user — never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub admin: bool,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            admin: u.admin,
        }
    }
}

/// JWT claims payload. The server binary's middleware decodes these to build
/// the caller [`dropspot_core::Identity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id (or "root" for the superadmin).
    pub sub: String,
    /// Login email.
    pub email: String,
    /// Admin flag.
    #[serde(default)]
    pub admin: bool,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
