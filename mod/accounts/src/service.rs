//! Account storage, password verification, and JWT issuance.

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use tracing::info;

use dropspot_core::{new_id, now_rfc3339, ServiceError};
use dropspot_kv::KVStore;

use crate::model::{Claims, TokenResponse, User};

/// Configuration for the accounts service.
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 24h).
    pub access_token_ttl: i64,
    /// Signing up with this email grants the admin flag.
    pub admin_email: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dropspot-dev-secret-change-me".to_string(),
            access_token_ttl: 86400, // 24h
            admin_email: "admin@example.com".to_string(),
        }
    }
}

/// The accounts service. Users live in KV under `account/user/{id}` with an
/// email index at `account/email/{email}`.
pub struct AccountsService {
    kv: Arc<dyn KVStore>,
    config: AccountsConfig,
}

fn user_key(id: &str) -> String {
    format!("account/user/{}", id)
}

fn email_key(email: &str) -> String {
    format!("account/email/{}", email)
}

impl AccountsService {
    pub fn new(kv: Arc<dyn KVStore>, config: AccountsConfig) -> Arc<Self> {
        Arc::new(Self { kv, config })
    }

    // ── Registration & lookup ───────────────────────────────────────

    /// Register a new user. Email must be unique.
    pub fn signup(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("invalid email address".into()));
        }
        if password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".into()));
        }
        if self.find_by_email(&email)?.is_some() {
            return Err(ServiceError::Validation(
                "this email address is already registered".into(),
            ));
        }

        let user = User {
            id: new_id(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            admin: email == self.config.admin_email,
            created_at: now_rfc3339(),
        };
        self.put_user(&user)?;
        info!(user_id = %user.id, admin = user.admin, "user registered");
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        let bytes = self
            .kv
            .get(&user_key(id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("user '{}' not found", id)))?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Storage(e.to_string()))
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let id = match self
            .kv
            .get(&email_key(email))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            Some(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            None => return Ok(None),
        };
        Ok(Some(self.get_user(&id)?))
    }

    fn put_user(&self, user: &User) -> Result<(), ServiceError> {
        let uk = user_key(&user.id);
        let ek = email_key(&user.email);
        let data = serde_json::to_vec(user).map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.kv
            .batch_set(&[(uk.as_str(), data.as_slice()), (ek.as_str(), user.id.as_bytes())])
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    /// Ensure the root superadmin account exists with the configured hash.
    /// Called at server bootstrap; the hash comes from the server TOML.
    pub fn ensure_root(&self, password_hash: &str) -> Result<(), ServiceError> {
        if self.find_by_email("root")?.is_some() {
            return Ok(());
        }
        let root = User {
            id: "root".to_string(),
            email: "root".to_string(),
            password_hash: password_hash.to_string(),
            admin: true,
            created_at: now_rfc3339(),
        };
        self.put_user(&root)?;
        info!("created root account");
        Ok(())
    }

    // ── Login ───────────────────────────────────────────────────────

    /// Verify credentials and issue an access token.
    pub fn login(&self, username: &str, password: &str) -> Result<(User, TokenResponse), ServiceError> {
        let lookup = if username == "root" {
            username.to_string()
        } else {
            username.trim().to_lowercase()
        };
        let user = self
            .find_by_email(&lookup)?
            .filter(|u| verify_password(password, &u.password_hash))
            .ok_or_else(|| ServiceError::Unauthorized("invalid email or password".into()))?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    /// Sign a JWT for the given user.
    pub fn issue_token(&self, user: &User) -> Result<TokenResponse, ServiceError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            admin: user.admin,
            iat: now.timestamp(),
            exp: now.timestamp() + self.config.access_token_ttl,
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("JWT encode failed: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_token_ttl as u64,
        })
    }
}

/// Hash a plain password with argon2id.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against an argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
