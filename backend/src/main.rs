use std::net::SocketAddr;

use anyhow::Context;
use chope_backend::config::Config;
use chope_backend::{create_router, initialize_backend};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let app_state = initialize_backend(&config).await?;
    let app = create_router(app_state, &config.cors_origin)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting server on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
