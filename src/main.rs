// src/main.rs

use std::sync::Arc;

use school_reports::{
    config::AppConfig,
    create_app,
    db::{self, PgSchoolData},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    // Initialize DB pool
    let pool = db::connect(&config).await?;
    let data = PgSchoolData::new(pool, config.table_prefix.clone())?;

    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(Arc::new(data), config);
    let app = create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "school reports listening");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
