use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use farm_market::config::Config;
use farm_market::entities::setup_schema;
use farm_market::middleware::auth::TokenKeys;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("farm_market=info,tower_http=info")),
        )
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "Server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = farm_market::connect(&config.database_url, config.db_max_connections).await?;
    setup_schema(&db).await?;

    let keys = Arc::new(TokenKeys::new(&config.secret, config.token_ttl_hours));
    let app = farm_market::app(Arc::new(db), keys);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Running");
    axum::serve(listener, app).await?;
    Ok(())
}
