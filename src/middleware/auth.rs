use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::AppError;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::AppState;

/// JWT Claims structure matching the token payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // identity provider user id
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Caller resolved from the bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// JWT configuration constants
pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Decode and validate a bearer token against `secret`
pub fn verify_jwt_token(token: &str, secret: &str) -> Result<JwtClaims, AppError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(JWT_ALGORITHM);

    let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
        warn!("JWT validation failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::authentication("Your session has expired. Please log in again.")
            }
            _ => AppError::authentication("Unauthorized"),
        }
    })?;

    Ok(token_data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header");
            AppError::authentication("Unauthorized")
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warn!("Invalid Authorization header format");
            AppError::authentication("Unauthorized")
        })?;

    Ok(token)
}

/// Extract and validate JWT token from Authorization header
pub async fn extract_current_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers)?;
    let claims = verify_jwt_token(token, &state.jwt_secret)?;

    if claims.sub.trim().is_empty() {
        warn!("JWT without subject");
        return Err(AppError::authentication("Unauthorized"));
    }

    let current_user = CurrentUser {
        user_id: claims.sub,
        email: claims.email,
    };

    debug!(user_id = %current_user.user_id, "🔐 JWT authentication successful");

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}
