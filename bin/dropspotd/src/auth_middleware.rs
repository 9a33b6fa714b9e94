//! JWT authentication middleware.
//!
//! Extracts the JWT from `Authorization: Bearer <token>`, validates it,
//! and stores the caller [`Identity`] in request extensions for handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dropspot_accounts::model::Claims;
use dropspot_core::{Identity, ServiceError};
use jsonwebtoken::{DecodingKey, Validation};

/// Shared JWT configuration for the middleware.
#[derive(Clone)]
pub struct JwtState {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

/// Middleware that extracts and validates the JWT.
///
/// If the request path is in the public list, the middleware passes
/// through. Otherwise it requires a valid token and stores the decoded
/// [`Identity`] in request extensions.
pub async fn auth_middleware(
    State(jwt_state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let path = request.uri().path().to_string();

    if is_public_path(&path) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;

    let token_data =
        jsonwebtoken::decode::<Claims>(token, &jwt_state.decoding_key, &jwt_state.validation)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

    let claims = token_data.claims;
    request.extensions_mut().insert(Identity {
        user_id: claims.sub,
        email: claims.email,
        admin: claims.admin,
    });

    Ok(next.run(request).await)
}

/// Check if a request path is public (no auth required).
///
/// Drop listing and single-drop reads are browsable anonymously;
/// join/leave/claim under `/drops/{id}/...` are not.
fn is_public_path(path: &str) -> bool {
    if matches!(path, "/" | "/health" | "/version" | "/drops" | "/drops/") {
        return true;
    }
    if let Some(rest) = path.strip_prefix("/drops/") {
        if !rest.contains('/') {
            return true;
        }
    }
    path.starts_with("/auth/login") || path.starts_with("/auth/signup")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths() {
        assert!(is_public_path("/"));
        assert!(is_public_path("/health"));
        assert!(is_public_path("/version"));
        assert!(is_public_path("/drops"));
        assert!(is_public_path("/drops/abc123"));
        assert!(is_public_path("/auth/login"));
        assert!(is_public_path("/auth/signup"));
    }

    #[test]
    fn protected_paths() {
        assert!(!is_public_path("/drops/abc123/claim"));
        assert!(!is_public_path("/drops/abc123/join"));
        assert!(!is_public_path("/drops/abc123/leave"));
        assert!(!is_public_path("/auth/me"));
        assert!(!is_public_path("/admin/drops"));
        assert!(!is_public_path("/admin/drops/abc123"));
    }
}
