use anyhow::Context;

use stocksync_infra::SyncConfig;
use stocksync_observability::Logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SyncConfig::from_env().context("invalid configuration")?;
    stocksync_observability::init_with(config.log_format);

    let services = stocksync_api::app::build_services(&config, Logger::current()).await?;
    let app = stocksync_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        max_concurrency = config.sync.max_concurrency(),
        batch_size = config.sync.batch_size(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
