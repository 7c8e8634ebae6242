use anyhow::Context;

use storefront_infra::{AppConfig, EventLogWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    storefront_observability::init(config.log_format);
    tracing::info!(config = %config.summary(), "starting {}", config.app_name);

    let services = storefront_app::build_services(&config).await?;
    let worker = EventLogWorker::spawn("event-log", services.event_bus())
        .context("spawning event log worker")?;

    tracing::info!(backend = services.backend(), "ready; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    tracing::info!("shutting down");
    let handled = tokio::task::spawn_blocking(move || worker.shutdown())
        .await
        .context("joining event log worker")?;
    tracing::info!(events = handled, "stopped");

    Ok(())
}
