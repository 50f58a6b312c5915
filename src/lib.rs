pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod money;
pub mod principal;
pub mod services;

use axum::Router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::middleware::auth::TokenKeys;
use crate::middleware::logging::logging_middleware;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// The whole HTTP surface, with request tracing and logging.
pub fn app(db: Arc<DatabaseConnection>, keys: Arc<TokenKeys>) -> Router {
    create_api_router(db, keys)
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
