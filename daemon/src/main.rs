use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use promodraw_common::crypto::Csprng;
use promodraw_daemon::{
    config::DaemonConfig,
    core::{storage::PgStorage, DrawService},
    posthog::{PostHogClient, PostHogConfig},
    rpc::RpcServer,
};

#[actix_web::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::parse();

    env_logger::Builder::from_default_env()
        .filter_level(config.log_level)
        .format_timestamp_millis()
        .init();

    info!("promodraw daemon v{}", promodraw_common::VERSION);

    // No entropy, no draws: refuse to start at all.
    let rng = Arc::new(Csprng::from_entropy().context("failed to seed the draw CSPRNG")?);

    let zone = config.draw_zone()?;

    let storage = PgStorage::connect(&config.database_url(), config.db_max_connections)
        .await
        .context("failed to open the database")?;

    let analytics = Arc::new(PostHogClient::new(PostHogConfig {
        endpoint: config.posthog_endpoint.clone(),
        api_key: config.posthog_api_key.clone(),
        timeout: Duration::from_secs(config.posthog_timeout_secs),
    }));

    let service = Arc::new(DrawService::new(storage, rng, analytics, zone));

    let server = RpcServer::start(service, &config.rpc_bind_address, &config.frontend_url).await?;
    info!("HTTP API listening on {}", config.rpc_bind_address);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    info!("shutdown signal received");
    server.stop().await;

    Ok(())
}
