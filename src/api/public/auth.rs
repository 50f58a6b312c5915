use axum::{extract::Extension, http::StatusCode, response::Response, routing::post, Json, Router};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::auth::{generate_token, TokenKeys};
use crate::middleware::logging::to_response;
use crate::services::accounts::{
    self, DeliveryPreferences, FarmDetails, NewUser, PublicUser,
};
use crate::services::commit_or_rollback;

pub fn auth_router(db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .route("/register_farmer", post(register_farmer))
        .route("/register_buyer", post(register_buyer))
        .route("/login", post(login))
        .layer(Extension(db))
        .layer(Extension(keys))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterFarmer {
    #[serde(flatten)]
    #[validate(nested)]
    user: NewUser,
    #[serde(flatten)]
    #[validate(nested)]
    farm: FarmDetails,
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterBuyer {
    #[serde(flatten)]
    #[validate(nested)]
    user: NewUser,
    #[serde(flatten)]
    #[validate(nested)]
    preferences: DeliveryPreferences,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(length(min = 1, message = "Email/username and password are required"))]
    email_or_username: String,
    #[validate(length(min = 1, message = "Email/username and password are required"))]
    password: String,
}

async fn register_farmer(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    ValidatedJson(payload): ValidatedJson<RegisterFarmer>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = accounts::register_farmer(&txn, payload.user, payload.farm).await;
    let user = commit_or_rollback(txn, result).await?;

    let token = generate_token(&keys, user.id, user.role)?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Farmer registered successfully",
                "access_token": token,
                "user_id": user.id
            })),
        ),
        Ok(()),
    ))
}

async fn register_buyer(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    ValidatedJson(payload): ValidatedJson<RegisterBuyer>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = accounts::register_buyer(&txn, payload.user, payload.preferences).await;
    let user = commit_or_rollback(txn, result).await?;

    let token = generate_token(&keys, user.id, user.role)?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Buyer registered successfully",
                "access_token": token,
                "user_id": user.id
            })),
        ),
        Ok(()),
    ))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = accounts::login(&txn, &payload.email_or_username, &payload.password).await;
    let user = commit_or_rollback(txn, result).await?;

    let token = generate_token(&keys, user.id, user.role)?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful",
                "access_token": token,
                "user": PublicUser::from(user)
            })),
        ),
        Ok(()),
    ))
}
