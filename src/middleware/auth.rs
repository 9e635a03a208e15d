// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! Tokens are issued by the auth provider and signed HS256 with the shared
//! project secret. This service only verifies them.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie holding the access token.
pub const AUTH_COOKIE: &str = "sf_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (auth provider user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify a token and return the caller.
pub fn verify_jwt(
    token: &str,
    signing_key: &[u8],
    audience: Option<&str>,
) -> Result<AuthUser, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "JWT rejected");
        AppError::InvalidToken
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(AuthUser {
        user_id: token_data.claims.sub,
        email: token_data.claims.email,
    })
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Header first (API clients), then the session cookie
    let token = bearer_token(&request)
        .or_else(|| jar.get(AUTH_COOKIE).map(|c| c.value().to_string()))
        .ok_or(AppError::Unauthorized)?;

    let auth_user = verify_jwt(
        &token,
        &state.config.jwt_signing_key,
        state.config.jwt_audience.as_deref(),
    )?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Create a JWT in the auth provider's format (local tooling and tests).
pub fn create_jwt(
    user_id: &str,
    email: Option<&str>,
    audience: Option<&str>,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 60 * 60, // 1 hour
        email: email.map(str::to_string),
        aud: audience.map(str::to_string),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"unit_test_key_that_is_long_enough";

    #[test]
    fn test_roundtrip_with_audience() {
        let token = create_jwt("user-1", Some("a@b.c"), Some("authenticated"), KEY).unwrap();
        let user = verify_jwt(&token, KEY, Some("authenticated")).unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = create_jwt("user-1", None, Some("anon"), KEY).unwrap();
        assert!(matches!(
            verify_jwt(&token, KEY, Some("authenticated")),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_audience_ignored_when_not_configured() {
        let token = create_jwt("user-1", None, Some("anything"), KEY).unwrap();
        assert!(verify_jwt(&token, KEY, None).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = create_jwt("user-1", None, None, KEY).unwrap();
        assert!(verify_jwt(&token, b"some_other_key_entirely_different", None).is_err());
    }
}
