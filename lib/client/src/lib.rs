//! DropSpot HTTP client.
//!
//! Authentication is handled by pluggable [`TokenSource`] implementations
//! (Go-style `oauth2.TokenSource` pattern). The [`registry::DropRegistry`]
//! keeps a local cache of drops that is only ever patched from
//! server-confirmed responses.
//!
//! # Usage
//!
//! ```ignore
//! use dropspot_client::{DropRegistry, HttpArbitrator, PasswordLogin};
//!
//! let ts = PasswordLogin::new("http://localhost:8080", "root", "secret");
//! let api = HttpArbitrator::new("http://localhost:8080", Arc::new(ts));
//! let mut registry = DropRegistry::new(api);
//! let drops = registry.refresh().await?;
//! ```

pub mod registry;

pub use registry::{ArbitratorApi, DropFields, DropRecord, DropRegistry, HttpArbitrator};

use serde::Deserialize;

// ── Error ───────────────────────────────────────────────────────────

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the request (4xx/5xx other than 401/404).
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The target record does not exist on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure — safe to retry with backoff.
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),

    /// Rejected locally before any round trip.
    #[error("validation: {0}")]
    Validation(String),
}

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable token provider. Called before every API request.
///
/// Implementations handle token acquisition, caching, and refresh.
/// Returns `Ok(None)` to skip the Authorization header (anonymous).
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Result<Option<String>, ApiError>;
}

/// No authentication — anonymous requests.
pub struct NoAuth;

#[async_trait::async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(None)
    }
}

/// Static bearer token (already obtained externally).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(Some(self.0.clone()))
    }
}

/// Password-based login. Lazily authenticates on first use, caches the
/// JWT, and re-authenticates when the token expires.
pub struct PasswordLogin {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    cached: tokio::sync::RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    /// Absolute expiry timestamp (seconds since epoch).
    expires_at: i64,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    expires_in: u64,
}

impl PasswordLogin {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            cached: tokio::sync::RwLock::new(None),
        }
    }

    async fn do_login(&self) -> Result<CachedToken, ApiError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("login failed ({}): {}", status, body)));
        }

        let lr: LoginResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("login response: {}", e)))?;

        let now = chrono::Utc::now().timestamp();
        // Expire 30s early to avoid edge-case races.
        let expires_at = now + lr.expires_in as i64 - 30;

        Ok(CachedToken {
            access_token: lr.access_token,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for PasswordLogin {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        // Fast path: read lock, check cache.
        {
            let guard = self.cached.read().await;
            if let Some(ref cached) = *guard {
                let now = chrono::Utc::now().timestamp();
                if now < cached.expires_at {
                    return Ok(Some(cached.access_token.clone()));
                }
            }
        }

        // Slow path: write lock, re-check, login.
        let mut guard = self.cached.write().await;
        // Double-check after acquiring write lock.
        if let Some(ref cached) = *guard {
            let now = chrono::Utc::now().timestamp();
            if now < cached.expires_at {
                return Ok(Some(cached.access_token.clone()));
            }
        }

        let fresh = self.do_login().await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_auth_returns_none() {
        let ts = NoAuth;
        assert!(ts.token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn static_token_returns_value() {
        let ts = StaticToken::new("my-jwt-token");
        assert_eq!(ts.token().await.unwrap(), Some("my-jwt-token".to_string()));
    }
}
