use std::{env, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use farm_client::{
    domain::{ControlCategory, SettingValue},
    FarmClient,
};
use farm_monitor::{
    config::AppConfig,
    control::{ControlPanel, Device, DeviceMode},
    observability,
};

const USAGE: &str = "usage: farmctl <command>
  status
  mode <device> <auto|manual|toggle>
  setting <key> [value]
  controls [settings|sensors|status] [--writable]
  raw-read <addr> [count]
  raw-write <addr> <value>
  health";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("{USAGE}");
    };

    let cfg = AppConfig::load()?;
    let client = Arc::new(FarmClient::new(cfg.api_config()?)?);
    let panel = ControlPanel::new(client.clone());

    match (command.as_str(), &args[1..]) {
        ("status", []) => {
            for (device, mode) in panel.modes().await {
                match mode {
                    Some(mode) => println!("{device:<16} {mode}"),
                    None => println!("{device:<16} unknown"),
                }
            }
        }
        ("mode", [device, action]) => {
            let device: Device = device.parse()?;
            let mode = match action.as_str() {
                "auto" => DeviceMode::Auto,
                "manual" => DeviceMode::Manual,
                "toggle" => panel.toggle(device).await?,
                other => bail!("unknown mode '{other}'\n{USAGE}"),
            };
            if action != "toggle" {
                panel.set_mode(device, mode).await?;
            }
            println!("{device} -> {mode}");
        }
        ("setting", [key]) => {
            let resp = client
                .setting(key)
                .await
                .ok_or_else(|| anyhow!("setting '{key}' could not be read"))?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        ("setting", [key, value]) => {
            let value: SettingValue = value.parse().map_err(|e: String| anyhow!(e))?;
            let resp = client.set_setting(key, value).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        ("controls", rest) => {
            let writable_only = rest.iter().any(|a| a == "--writable");
            let category = rest
                .iter()
                .find(|a| !a.starts_with("--"))
                .map(|c| c.parse::<ControlCategory>())
                .transpose()
                .map_err(|e| anyhow!(e))?;
            let list = client
                .controls_list(category, writable_only)
                .await
                .ok_or_else(|| anyhow!("control list unavailable"))?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ("raw-read", [addr, rest @ ..]) if rest.len() <= 1 => {
            let addr: u16 = addr.parse().context("address must be 0-65535")?;
            let count: u16 = match rest.first() {
                Some(c) => c.parse().context("count must be a positive integer")?,
                None => 1,
            };
            let read = client.read_raw(addr, count).await?;
            println!("{}", serde_json::to_string_pretty(&read)?);
        }
        ("raw-write", [addr, value]) => {
            let addr: u16 = addr.parse().context("address must be 0-65535")?;
            let value: u16 = value.parse().context("value must be 0-65535")?;
            let written = client.write_raw(addr, value).await?;
            println!("{}", serde_json::to_string_pretty(&written)?);
        }
        ("health", []) => {
            let health = client.check_health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}
