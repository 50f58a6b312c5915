use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, put},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::logging::to_response;
use crate::principal::Principal;
use crate::services::checkout::{self, CheckoutRequest};
use crate::services::{begin_write, commit_or_rollback, order_status};

pub fn order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", get(order_detail))
        .route("/orders/:id/status", put(update_status))
        .layer(Extension(db))
}

#[derive(Debug, Deserialize, Validate)]
struct StatusUpdate {
    #[validate(length(min = 1, message = "Status is required"))]
    status: String,
}

async fn place_order(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<CheckoutRequest>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer("Only buyers can place orders")?;
    let txn = begin_write(&db)
        .await
        .map_err(|err| checkout::placement_failed(err.into()))?;
    let result = checkout::place_order(&txn, buyer, payload).await;
    let order = commit_or_rollback(txn, result)
        .await
        .map_err(checkout::placement_failed)?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Order placed successfully",
                "order_id": order.id
            })),
        ),
        Ok(()),
    ))
}

async fn list_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = order_status::list_orders(&txn, principal).await;
    let orders = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "orders": orders }))),
        Ok(()),
    ))
}

async fn order_detail(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = order_status::order_detail(&txn, principal, id).await;
    let detail = commit_or_rollback(txn, result).await?;
    Ok(to_response((StatusCode::OK, Json(detail)), Ok(())))
}

async fn update_status(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<StatusUpdate>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = order_status::update_status(&txn, principal, id, &payload.status).await;
    let order = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": format!("Order status updated to {}", order.status),
                "status": order.status
            })),
        ),
        Ok(()),
    ))
}
