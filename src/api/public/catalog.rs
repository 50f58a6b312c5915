use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::services::catalog;

pub fn catalog_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .layer(Extension(db))
}

async fn list_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let products = catalog::list_products(&*db).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "products": products }))),
        Ok(()),
    ))
}

async fn get_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let product = catalog::get_product(&*db, id).await?;
    Ok(to_response((StatusCode::OK, Json(product)), Ok(())))
}

async fn list_categories(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let categories = catalog::list_categories(&*db).await?;
    Ok(to_response(
        (StatusCode::OK, Json(json!({ "categories": categories }))),
        Ok(()),
    ))
}
