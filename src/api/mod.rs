pub mod buyer;
pub mod public;
pub mod user;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::middleware::auth::TokenKeys;
use buyer::buyer_api_router;
use public::public_api_router;
use user::user_api_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .merge(public_api_router(shared_db.clone(), keys.clone()))
        .merge(buyer_api_router(shared_db.clone(), keys.clone()))
        .merge(user_api_router(shared_db, keys))
}
