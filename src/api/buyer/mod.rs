pub mod cart;

use axum::{middleware::from_fn_with_state, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::entities::user::Role;
use crate::middleware::auth::{auth_middleware, AuthState, TokenKeys};
use cart::cart_router;

pub fn buyer_api_router(db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .merge(cart_router(db.clone()))
        .layer(from_fn_with_state(
            AuthState {
                db,
                keys,
                role: Some(Role::Buyer),
            },
            auth_middleware,
        ))
}
