pub mod auth;
pub mod catalog;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::middleware::auth::TokenKeys;
use auth::auth_router;
use catalog::catalog_router;

pub fn public_api_router(db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .merge(auth_router(db.clone(), keys))
        .merge(catalog_router(db))
}
