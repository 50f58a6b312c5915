use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::logging::to_response;
use crate::principal::Principal;
use crate::services::messaging::{self, NewMessage};
use crate::services::commit_or_rollback;

pub fn message_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/:other_user_id", get(thread))
        .route("/conversations", get(conversations))
        .layer(Extension(db))
}

async fn send_message(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<NewMessage>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = messaging::send(&txn, principal.user_id(), payload).await;
    let message = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Message sent successfully",
                "message_id": message.id
            })),
        ),
        Ok(()),
    ))
}

async fn conversations(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = messaging::conversations(&txn, principal.user_id()).await;
    let people = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "conversations": people }))),
        Ok(()),
    ))
}

async fn thread(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(other_user_id): Path<i32>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = messaging::thread(&txn, principal.user_id(), other_user_id).await;
    let messages = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "messages": messages }))),
        Ok(()),
    ))
}
