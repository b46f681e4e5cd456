//! Customer identity from identity-provider JWTs
//!
//! Tokens are HS256 with `sub` = customer identity and `role` = member | admin.
//! Ownership checks elsewhere compare identities only; the role gates the
//! admin routes and nothing else.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{CustomerIdentity, Role};

use crate::state::AppState;

/// JWT claims issued by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Customer identity
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct Identity {
    pub customer: CustomerIdentity,
    pub role: Role,
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Issue a token. Production tokens come from the identity provider; this is
/// for local tooling and tests.
pub fn create_token(
    customer: &str,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: customer.to_string(),
        role,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Identity, AppError> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::invalid_token("Token has no subject"));
    }

    Ok(Identity {
        customer: CustomerIdentity::new(token_data.claims.sub),
        role: token_data.claims.role,
    })
}

/// Middleware that verifies the bearer token and inserts [`Identity`]
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::not_authenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

    let identity = verify_token(token, &state.config.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Layered after [`identity_middleware`] on admin routes
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let is_admin = request
        .extensions()
        .get::<Identity>()
        .is_some_and(|identity| identity.role.is_admin());
    if !is_admin {
        return Err(AppError::new(ErrorCode::AdminRequired));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_keeps_identity_and_role() {
        let token = create_token("amy@example.com", Role::Admin, "secret").unwrap();
        let identity = verify_token(&token, "secret").unwrap();
        assert_eq!(identity.customer.as_str(), "amy@example.com");
        assert!(identity.role.is_admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("amy@example.com", Role::Member, "secret").unwrap();
        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_missing_role_defaults_to_member() {
        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "amy@example.com",
            "exp": now + 60,
            "iat": now,
        });
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let identity = verify_token(&token, "secret").unwrap();
        assert_eq!(identity.role, Role::Member);
    }
}
