use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::entities::user::{Entity as UserEntity, Role};
use crate::error::ApiError;
use crate::principal::Principal;

/// Verifies the bearer token and puts `Claims` and `Principal` into the
/// request extensions. When `role` is set, other roles get a 403.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;

    let claims = validate_token(&state.db, &state.keys, token)
        .await
        .map_err(|err| {
            warn!(error = %err, "Rejected token");
            ApiError::from(err)
        })?;

    if let Some(required) = state.role {
        if claims.role != required {
            return Err(ApiError::Forbidden(format!(
                "Only {required}s can access this resource"
            )));
        }
    }

    debug!(user_id = claims.user_id, role = %claims.role, "Authenticated request");
    req.extensions_mut()
        .insert(Principal::new(claims.user_id, claims.role));
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub keys: Arc<TokenKeys>,
    pub role: Option<Role>,
}

/// HS256 signing material and token lifetime.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }
}

pub fn generate_token(
    keys: &TokenKeys,
    user_id: i32,
    role: Role,
) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(keys.ttl)
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims { user_id, role, exp };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|_| AuthMiddlewareError::GenerationFail)
}

/// Decodes the token and checks the user still exists, is active and
/// still holds the role the token was issued for.
pub async fn validate_token(
    db: &DatabaseConnection,
    keys: &TokenKeys,
    token: &str,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthMiddlewareError::TokenExpired,
            _ => AuthMiddlewareError::ValidationFail,
        })?
        .claims;

    match UserEntity::find_by_id(claims.user_id).one(db).await {
        Ok(Some(user)) if user.role == claims.role => {
            if user.is_active {
                Ok(claims)
            } else {
                Err(AuthMiddlewareError::Inactive)
            }
        }
        Ok(_) => Err(AuthMiddlewareError::InvalidUserOrRole),
        Err(err) => Err(AuthMiddlewareError::InternalServerError(err.to_string())),
    }
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Account is inactive")]
    Inactive,
    #[error("Internal server error")]
    InternalServerError(String),
}

impl From<AuthMiddlewareError> for ApiError {
    fn from(err: AuthMiddlewareError) -> Self {
        match err {
            AuthMiddlewareError::GenerationFail => ApiError::Storage(err.to_string()),
            AuthMiddlewareError::InternalServerError(detail) => ApiError::Storage(detail),
            AuthMiddlewareError::Inactive => ApiError::Forbidden(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
