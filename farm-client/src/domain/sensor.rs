use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::reading::numeric_value;
use crate::keys::KeyMapping;

/// One poll of `/api/sensors/all`, keyed by UI key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub values: BTreeMap<String, Option<f64>>,
}

impl SensorSnapshot {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub address: Option<u16>,
    #[serde(default)]
    pub description: Option<String>,
    /// Absent means the entry is usable; only an explicit `false` drops it.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SensorsEnvelope {
    /// Reverse-map API names to UI keys. Entries flagged as failed or not
    /// covered by the mapping are dropped.
    pub fn into_snapshot(self, keys: &KeyMapping, fetched_at: OffsetDateTime) -> SensorSnapshot {
        let values = self
            .sensors
            .into_iter()
            .filter(|(_, entry)| entry.success != Some(false))
            .filter_map(|(api_name, entry)| {
                let ui_key = keys.to_ui(&api_name)?;
                let value = entry.value.as_ref().and_then(numeric_value);
                Some((ui_key.to_string(), value))
            })
            .collect();

        SensorSnapshot { fetched_at, values }
    }
}
