//! Storefront Engine - pricing, stock validation and catalog queries over HTTP

use anyhow::Result;
use storefront_engine::{api, config::Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(low_stock_threshold = config.low_stock_threshold, max_line_items = config.max_line_items, "configuration loaded");

    let app = api::router(api::AppState::new(config));
    tracing::info!("🚀 Storefront engine listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
