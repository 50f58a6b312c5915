use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::logging::to_response;
use crate::principal::Principal;
use crate::services::catalog::{self, NewProduct, ProductChanges};
use crate::services::commit_or_rollback;

pub fn product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/farmer", get(my_products))
        .route("/products/:id", put(update_product).delete(delete_product))
        .layer(Extension(db))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(payload): ValidatedJson<NewProduct>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can create products")?;
    let txn = db.begin().await?;
    let result = catalog::create_product(&txn, farmer, payload).await;
    let product = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Product created successfully",
                "product_id": product.id,
                "product": product
            })),
        ),
        Ok(()),
    ))
}

async fn update_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<ProductChanges>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can update products")?;
    let txn = db.begin().await?;
    let result = catalog::update_product(&txn, farmer, id, payload).await;
    let product = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Product updated successfully",
                "product": product
            })),
        ),
        Ok(()),
    ))
}

async fn delete_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can delete products")?;
    let txn = db.begin().await?;
    let result = catalog::delete_product(&txn, farmer, id).await;
    commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Product deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

async fn my_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let farmer = principal.farmer("Only farmers can access their own products")?;
    let txn = db.begin().await?;
    let result = catalog::farmer_products(&txn, farmer).await;
    let products = commit_or_rollback(txn, result).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "products": products }))),
        Ok(()),
    ))
}
