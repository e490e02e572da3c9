use std::env;

use anyhow::{bail, Result};
use farm_client::FarmClient;
use farm_monitor::{aggregate::aggregate_hourly, charts, config::AppConfig, observability};

/// Usage: history_chart [window]
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let window = env::args().nth(1).unwrap_or_else(|| cfg.history.window.clone());

    let api = cfg.api_config()?;
    let offset = api.local_offset;
    let client = FarmClient::new(api)?;

    let Some(readings) = client.history(&window).await else {
        bail!("history for window '{window}' is unavailable");
    };

    let series = aggregate_hourly(&readings, cfg.history.tracked_keys.as_slice(), offset);
    if series.is_empty() {
        tracing::warn!(%window, "no history rows in window");
    }

    let models = charts::build_all(&series);
    println!("{}", serde_json::to_string_pretty(&models)?);
    Ok(())
}
