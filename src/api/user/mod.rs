pub mod messages;
pub mod offers;
pub mod orders;
pub mod products;
pub mod profile;

use axum::{middleware::from_fn_with_state, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::middleware::auth::{auth_middleware, AuthState, TokenKeys};
use messages::message_router;
use offers::offer_router;
use orders::order_router;
use products::product_router;
use profile::profile_router;

/// Routes open to any signed-in user. Handlers check the role themselves.
pub fn user_api_router(db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .merge(offer_router(db.clone()))
        .merge(order_router(db.clone()))
        .merge(product_router(db.clone()))
        .merge(profile_router(db.clone()))
        .merge(message_router(db.clone()))
        .layer(from_fn_with_state(
            AuthState {
                db,
                keys,
                role: None,
            },
            auth_middleware,
        ))
}
