use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reading::RawReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCategory {
    Settings,
    Sensors,
    Status,
}

impl ControlCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Sensors => "sensors",
            Self::Status => "status",
        }
    }
}

impl std::str::FromStr for ControlCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "settings" => Ok(Self::Settings),
            "sensors" => Ok(Self::Sensors),
            "status" => Ok(Self::Status),
            other => Err(format!("unknown control category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub address: u16,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub writable: bool,
    pub readable: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlList {
    pub total: usize,
    pub writable: usize,
    pub readable_only: usize,
    pub controls: Vec<ControlInfo>,
}

/// Body of the sensor, setting and status read endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub address: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReadResponse {
    /// Bit settings come back as booleans, registers as numbers.
    pub fn numeric(&self) -> Option<f64> {
        match self.value.as_ref()? {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// Value accepted by `PUT /api/settings/{name}`; integers stay integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Int(i64::from(v))
    }
}

impl std::str::FromStr for SettingValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Self::Int(i));
        }
        s.parse::<f64>()
            .map(Self::Float)
            .map_err(|_| format!("'{s}' is not a number"))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WriteRequest {
    pub value: SettingValue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub written_value: Option<Value>,
    #[serde(default)]
    pub verified_value: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub address: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub modbus: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Health {
    pub fn modbus_connected(&self) -> bool {
        self.modbus.as_deref() == Some("connected")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRead {
    #[serde(default)]
    pub success: bool,
    pub address: u16,
    pub count: u16,
    pub values: Vec<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWrite {
    #[serde(default)]
    pub success: bool,
    pub address: u16,
    pub written_value: u16,
    #[serde(default)]
    pub verified_value: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub data: Vec<RawReading>,
}
