use std::{env, sync::Arc};

use anyhow::{bail, Result};
use farm_client::FarmClient;
use farm_monitor::{
    auth::SessionGate,
    cameras,
    config::AppConfig,
    metrics_server, observability,
    observers::{LiveBoard, ObserverRegistry},
    poller::Poller,
    sources::ApiSensorSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // The gate is only active when [auth] is configured.
    if let Some(credentials) = cfg.auth.clone() {
        let gate = SessionGate::in_memory(credentials);
        let user = env::var("FARM_MONITOR_USER").unwrap_or_default();
        let password = env::var("FARM_MONITOR_PASSWORD").unwrap_or_default();
        if let Err(e) = gate.login(&user, &password, false) {
            bail!("{e}; set FARM_MONITOR_USER and FARM_MONITOR_PASSWORD");
        }
        tracing::info!(user = %gate.current_user(), "session opened");
    }

    let client = Arc::new(FarmClient::new(cfg.api_config()?)?);

    // A failed health check is reported but does not prevent polling.
    match client.check_health().await {
        Ok(health) if health.modbus_connected() => {
            tracing::info!(status = %health.status, "controller API reachable")
        }
        Ok(health) => tracing::warn!(
            status = %health.status,
            modbus = ?health.modbus,
            "controller API reachable but Modbus is not connected"
        ),
        Err(e) => tracing::warn!(error = %e, "controller API health check failed"),
    }

    let registry = Arc::new(ObserverRegistry::new());
    let board = Arc::new(LiveBoard::new());
    registry.register(board.clone());

    let source = ApiSensorSource::new(client.clone(), cfg.retry_policy());
    let poller = Poller::new(source, registry, cfg.poll_policy());
    poller.start();

    cameras::log_feeds(&cameras::camera_feeds(&cfg.cameras));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    poller.stop();

    println!("{}", board.render());
    Ok(())
}
