use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, put},
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::logging::to_response;
use crate::principal::Principal;
use crate::services::offer::{self, OfferAction};
use crate::services::commit_or_rollback;

pub fn offer_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/offers", get(list_offers).post(create_offer))
        .route("/offers/:id", put(farmer_response))
        .route("/offers/:id/buyer_response", put(buyer_response))
        .layer(Extension(db))
}

#[derive(Debug, Deserialize, Validate)]
struct NewOffer {
    product_id: i32,
    offer_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
struct OfferResponse {
    action: String,
    counter_price: Option<Decimal>,
}

fn responded(action: OfferAction) -> Response {
    to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": format!("Offer {action}ed successfully")
            })),
        ),
        Ok(()),
    )
}

async fn create_offer(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<NewOffer>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer("Only buyers can make offers")?;
    let txn = db.begin().await?;
    let result = offer::create_offer(&txn, buyer, payload.product_id, payload.offer_price).await;
    let created = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Offer submitted successfully",
                "offer_id": created.id
            })),
        ),
        Ok(()),
    ))
}

async fn farmer_response(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<OfferResponse>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can respond to offers")?;
    let action: OfferAction = payload.action.parse()?;
    let txn = db.begin().await?;
    let result = offer::respond_as_farmer(&txn, farmer, id, action, payload.counter_price).await;
    commit_or_rollback(txn, result).await?;
    Ok(responded(action))
}

async fn buyer_response(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<OfferResponse>,
) -> Result<Response, ApiError> {
    let buyer = principal.buyer("Only buyers can respond to counter offers")?;
    let action: OfferAction = payload.action.parse()?;
    let txn = db.begin().await?;
    let result = offer::respond_as_buyer(&txn, buyer, id, action, payload.counter_price).await;
    commit_or_rollback(txn, result).await?;
    Ok(responded(action))
}

async fn list_offers(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let txn = db.begin().await?;
    let result = offer::list_offers(&txn, principal).await;
    let offers = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "offers": offers }))),
        Ok(()),
    ))
}
