use axum::{extract::Extension, http::StatusCode, response::Response, routing::{get, put}, Json, Router};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::logging::to_response;
use crate::principal::Principal;
use crate::services::accounts::{self, DeliveryPreferences, FarmChanges, ProfileChanges, PublicUser};
use crate::services::commit_or_rollback;

pub fn profile_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/farm", put(update_farm))
        .route("/delivery_preferences", put(update_delivery_preferences))
        .layer(Extension(db))
}

async fn get_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = accounts::profile(&txn, principal).await;
    let profile = commit_or_rollback(txn, result).await?;
    Ok(to_response((StatusCode::OK, Json(profile)), Ok(())))
}

async fn update_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<ProfileChanges>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = accounts::update_profile(&txn, principal, payload).await;
    let user = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Profile updated successfully",
                "user": PublicUser::from(user)
            })),
        ),
        Ok(()),
    ))
}

async fn update_farm(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<FarmChanges>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can update farm details")?;
    let txn = db.begin().await?;
    let result = accounts::update_farm(&txn, farmer, payload).await;
    let farm = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Farm profile updated successfully",
                "farm": farm
            })),
        ),
        Ok(()),
    ))
}

async fn update_delivery_preferences(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<DeliveryPreferences>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer("Only buyers can update delivery preferences")?;
    let txn = db.begin().await?;
    let result = accounts::update_delivery_preferences(&txn, buyer, payload).await;
    let preferences = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Delivery preferences updated successfully",
                "preferences": preferences
            })),
        ),
        Ok(()),
    ))
}
