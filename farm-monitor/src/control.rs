use std::{fmt, str::FromStr, sync::Arc};

use farm_client::{domain::WriteResponse, ClientError, FarmClient};
use futures::future::join_all;

#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error("unknown device '{0}'")]
    UnknownDevice(String),
    #[error("auto/manual mode of {0} could not be read")]
    ModeUnavailable(Device),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Actuators with an auto/manual switch on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Dehumidifier,
    CirculationFan,
    Heating,
    Irrigation,
    Lighting,
}

impl Device {
    pub const ALL: [Device; 5] = [
        Device::Dehumidifier,
        Device::CirculationFan,
        Device::Heating,
        Device::Irrigation,
        Device::Lighting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dehumidifier => "dehumidifier",
            Self::CirculationFan => "circulation_fan",
            Self::Heating => "heating",
            Self::Irrigation => "irrigation",
            Self::Lighting => "lighting",
        }
    }

    /// UI setting key holding the auto-mode bit.
    pub fn auto_key(&self) -> &'static str {
        match self {
            Self::Dehumidifier => "dehumidifier_auto",
            Self::CirculationFan => "circulation_fan_auto",
            Self::Heating => "heating_auto",
            Self::Irrigation => "irrigation_auto",
            Self::Lighting => "lighting_auto",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Device {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Device::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ControlError::UnknownDevice(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Auto,
    Manual,
}

impl DeviceMode {
    pub fn from_value(v: f64) -> Option<Self> {
        if v == 1.0 {
            Some(Self::Auto)
        } else if v == 0.0 {
            Some(Self::Manual)
        } else {
            None
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Self::Auto => 1,
            Self::Manual => 0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Self::Auto => Self::Manual,
            Self::Manual => Self::Auto,
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.pad("auto"),
            Self::Manual => f.pad("manual"),
        }
    }
}

/// Reads and switches device modes through the settings endpoints.
#[derive(Clone)]
pub struct ControlPanel {
    client: Arc<FarmClient>,
}

impl ControlPanel {
    pub fn new(client: Arc<FarmClient>) -> Self {
        Self { client }
    }

    pub async fn mode(&self, device: Device) -> Result<DeviceMode, ControlError> {
        self.client
            .setting(device.auto_key())
            .await
            .and_then(|resp| resp.numeric())
            .and_then(DeviceMode::from_value)
            .ok_or(ControlError::ModeUnavailable(device))
    }

    /// All devices at once; a device whose mode cannot be read maps to `None`.
    pub async fn modes(&self) -> Vec<(Device, Option<DeviceMode>)> {
        let reads = Device::ALL.iter().map(|d| async move { (*d, self.mode(*d).await.ok()) });
        join_all(reads).await
    }

    pub async fn set_mode(
        &self,
        device: Device,
        mode: DeviceMode,
    ) -> Result<WriteResponse, ControlError> {
        let written = self.client.set_setting(device.auto_key(), mode.value()).await?;
        tracing::info!(%device, %mode, "device mode changed");
        Ok(written)
    }

    /// Reads the current mode and writes the opposite one.
    pub async fn toggle(&self, device: Device) -> Result<DeviceMode, ControlError> {
        let next = self.mode(device).await?.flipped();
        self.set_mode(device, next).await?;
        Ok(next)
    }
}
