use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
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
use crate::services::{cart, commit_or_rollback};

const BUYERS_ONLY: &str = "Only buyers can manage a cart";
const DEFAULT_QUANTITY: i32 = 1;

//ROUTERS
pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", put(update_item).delete(remove_item))
        .layer(Extension(db))
}

#[derive(Debug, Deserialize, Validate)]
struct AddItem {
    product_id: i32,
    quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateItem {
    quantity: i32,
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer(BUYERS_ONLY)?;
    let txn = db.begin().await?;
    let result = cart::view(&txn, buyer).await;
    let view = commit_or_rollback(txn, result).await?;
    Ok(to_response((StatusCode::OK, Json(view)), Ok(())))
}

async fn add_item(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<AddItem>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer(BUYERS_ONLY)?;
    let txn = db.begin().await?;
    let result = cart::add_item(
        &txn,
        buyer,
        payload.product_id,
        payload.quantity.unwrap_or(DEFAULT_QUANTITY),
    )
    .await;
    let item = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Item added to cart successfully",
                "cart_item_id": item.id,
                "quantity": item.quantity
            })),
        ),
        Ok(()),
    ))
}

async fn update_item(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateItem>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer(BUYERS_ONLY)?;
    let txn = db.begin().await?;
    let result = cart::update_item(&txn, buyer, id, payload.quantity).await;
    let item = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Cart item updated successfully",
                "cart_item_id": item.id,
                "quantity": item.quantity
            })),
        ),
        Ok(()),
    ))
}

async fn remove_item(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer(BUYERS_ONLY)?;
    let txn = db.begin().await?;
    let result = cart::remove_item(&txn, buyer, id).await;
    commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Cart item removed successfully"
            })),
        ),
        Ok(()),
    ))
}
