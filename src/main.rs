use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod catalog;
mod config;
mod filter;
mod geometry;
mod overpass;
mod routes;
mod style;

use cache::ResponseCache;
use catalog::Catalog;
use config::Config;
use overpass::OverpassClient;
use routes::{create_router, AppState};
use style::FeatureClassifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palmela_maps_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the durable response cache
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    let cache = ResponseCache::new(pool, config.cache_ttl_hours);
    cache.init_tables().await?;

    // Initialize the Overpass client over the configured mirrors
    let overpass = Arc::new(OverpassClient::new(&config, cache));

    // Static configuration tables, built once and shared
    let catalog = Arc::new(Catalog::palmela());
    let classifier = Arc::new(FeatureClassifier::palmela());

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        catalog,
        classifier,
        overpass,
    };

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
