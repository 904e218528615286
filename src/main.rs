//! WigVana Marketplace - API server

use anyhow::Result;

use wigvana::api::{self, AppState};
use wigvana::config::{self, AppConfig};
use wigvana::publisher::EventPublisher;
use wigvana::store;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    config::init_tracing(config.log_format);

    let store = store::open(&config).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    let app = api::router(AppState::new(store, EventPublisher::new(nats)), config.cors_permissive);

    let addr = config.socket_addr();
    tracing::info!(%addr, "WigVana marketplace listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
