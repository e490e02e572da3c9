use std::time::Duration;

use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::{
    control::WriteRequest, ControlCategory, ControlList, Health, HistoryResponse, RawRead,
    RawWrite, ReadResponse, Reading, SensorSnapshot, SensorsEnvelope, SettingValue,
    WriteResponse,
};
use crate::error::ClientError;
use crate::keys::{KeyMapping, KeyMappingError};

/// Request paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub health: String,
    pub controls_list: String,
    pub sensors_all: String,
    pub sensor: String,
    pub settings: String,
    pub status: String,
    pub raw_read: String,
    pub raw_write: String,
    pub history: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            health: "/health".to_string(),
            controls_list: "/api/controls/list".to_string(),
            sensors_all: "/api/sensors/all".to_string(),
            sensor: "/api/sensors".to_string(),
            settings: "/api/settings".to_string(),
            status: "/api/status".to_string(),
            raw_read: "/api/raw/read".to_string(),
            raw_write: "/api/raw/write".to_string(),
            history: "/api/history".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub sensor_keys: KeyMapping,
    pub setting_keys: KeyMapping,
    /// Offset used for history timestamps that carry none.
    pub local_offset: UtcOffset,
}

impl ApiConfig {
    pub fn with_defaults(base_url: impl Into<String>) -> Result<Self, KeyMappingError> {
        Ok(Self {
            base_url: base_url.into(),
            endpoints: Endpoints::default(),
            timeout: Duration::from_millis(5000),
            sensor_keys: KeyMapping::default_sensors()?,
            setting_keys: KeyMapping::default_settings()?,
            local_offset: UtcOffset::UTC,
        })
    }
}

/// How a response body's `success` flag is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuccessFlag {
    /// Must be present and `true`.
    Required,
    /// The body shape has no flag; only an explicit `false` fails.
    IfPresent,
}

fn check_success(resource: &str, body: &Value, flag: SuccessFlag) -> Result<(), ClientError> {
    let reported = body.get("success").and_then(Value::as_bool);
    let ok = match flag {
        SuccessFlag::Required => reported == Some(true),
        SuccessFlag::IfPresent => reported != Some(false),
    };
    if ok {
        return Ok(());
    }

    let reason = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match reported {
            None => "missing success flag".to_string(),
            Some(_) => "success=false".to_string(),
        });

    Err(ClientError::Rejected {
        resource: resource.to_string(),
        reason,
    })
}

fn log_failure(resource: &str, err: &ClientError) {
    metrics::counter!("farm_client_failures_total").increment(1);
    if err.is_rejection() {
        tracing::warn!(resource, error = %err, "API reported failure");
    } else {
        tracing::error!(resource, error = %err, "API request failed");
    }
}

/// Reads degrade to "no data".
fn read_or_none<T>(resource: &str, res: Result<T, ClientError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            log_failure(resource, &e);
            None
        }
    }
}

/// Writes and raw register access propagate the failure to the caller.
fn logged<T>(resource: &str, res: Result<T, ClientError>) -> Result<T, ClientError> {
    res.map_err(|e| {
        log_failure(resource, &e);
        e
    })
}

/// REST client for the greenhouse controller API.
///
/// One method per resource. Read methods log and return `None` on any
/// failure; `set_setting`, `read_raw` and `write_raw` return the error.
/// Nothing is retried here.
#[derive(Debug, Clone)]
pub struct FarmClient {
    http: reqwest::Client,
    cfg: ApiConfig,
}

impl FarmClient {
    pub fn new(cfg: ApiConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.cfg
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn request_json(
        &self,
        resource: &str,
        req: RequestBuilder,
        url: &str,
        flag: SuccessFlag,
    ) -> Result<Value, ClientError> {
        metrics::counter!("farm_client_requests_total").increment(1);

        let resp = req.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = resp.json().await.map_err(|e| ClientError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        check_success(resource, &body, flag)?;
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &str,
        req: RequestBuilder,
        url: &str,
        flag: SuccessFlag,
    ) -> Result<T, ClientError> {
        let body = self.request_json(resource, req, url, flag).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn check_health(&self) -> Result<Health, ClientError> {
        let url = self.url(&self.cfg.endpoints.health);
        let health: Health =
            logged("health", self.fetch("health", self.http.get(&url), &url, SuccessFlag::IfPresent).await)?;
        tracing::debug!(status = %health.status, modbus = ?health.modbus, "health check");
        Ok(health)
    }

    pub async fn controls_list(
        &self,
        category: Option<ControlCategory>,
        writable_only: bool,
    ) -> Option<ControlList> {
        let url = self.url(&self.cfg.endpoints.controls_list);

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(category) = category {
            params.push(("category", category.as_str()));
        }
        if writable_only {
            params.push(("writable_only", "true"));
        }

        let req = self.http.get(&url).query(&params);
        read_or_none(
            "controls_list",
            self.fetch("controls_list", req, &url, SuccessFlag::IfPresent).await,
        )
    }

    pub async fn all_sensors(&self) -> Option<SensorSnapshot> {
        let url = self.url(&self.cfg.endpoints.sensors_all);
        let envelope: SensorsEnvelope = read_or_none(
            "sensors_all",
            self.fetch("sensors_all", self.http.get(&url), &url, SuccessFlag::Required).await,
        )?;

        tracing::debug!(count = envelope.count, "sensor values received");
        Some(envelope.into_snapshot(&self.cfg.sensor_keys, OffsetDateTime::now_utc()))
    }

    pub async fn sensor(&self, ui_key: &str) -> Option<ReadResponse> {
        let api_key = self.cfg.sensor_keys.to_api(ui_key);
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.sensor, api_key));
        read_or_none(
            "sensor",
            self.fetch("sensor", self.http.get(&url), &url, SuccessFlag::Required).await,
        )
    }

    pub async fn setting(&self, ui_key: &str) -> Option<ReadResponse> {
        let api_key = self.cfg.setting_keys.to_api(ui_key);
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.settings, api_key));
        read_or_none(
            "setting",
            self.fetch("setting", self.http.get(&url), &url, SuccessFlag::Required).await,
        )
    }

    pub async fn set_setting(
        &self,
        ui_key: &str,
        value: impl Into<SettingValue>,
    ) -> Result<WriteResponse, ClientError> {
        let value = value.into();
        let api_key = self.cfg.setting_keys.to_api(ui_key);
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.settings, api_key));

        let req = self.http.put(&url).json(&WriteRequest { value });
        let written: WriteResponse =
            logged("set_setting", self.fetch("set_setting", req, &url, SuccessFlag::Required).await)?;

        tracing::info!(
            setting = api_key,
            %value,
            verified = ?written.verified_value,
            "setting written"
        );
        Ok(written)
    }

    pub async fn status(&self, name: &str) -> Option<ReadResponse> {
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.status, name));
        read_or_none(
            "status",
            self.fetch("status", self.http.get(&url), &url, SuccessFlag::Required).await,
        )
    }

    pub async fn read_raw(&self, address: u16, count: u16) -> Result<RawRead, ClientError> {
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.raw_read, address));
        let req = self.http.get(&url).query(&[("count", count)]);
        logged("raw_read", self.fetch("raw_read", req, &url, SuccessFlag::Required).await)
    }

    pub async fn write_raw(&self, address: u16, value: u16) -> Result<RawWrite, ClientError> {
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.raw_write, address));
        let req = self.http.post(&url).json(&serde_json::json!({ "value": value }));
        let written: RawWrite =
            logged("raw_write", self.fetch("raw_write", req, &url, SuccessFlag::Required).await)?;

        tracing::info!(address, value, verified = ?written.verified_value, "register written");
        Ok(written)
    }

    /// Rows whose timestamp cannot be parsed are skipped, not fatal.
    pub async fn history(&self, window: &str) -> Option<Vec<Reading>> {
        let url = self.url(&format!("{}/{}", self.cfg.endpoints.history, window));
        let resp: HistoryResponse = read_or_none(
            "history",
            self.fetch("history", self.http.get(&url), &url, SuccessFlag::IfPresent).await,
        )?;

        let reported = resp.count;
        let mut readings = Vec::with_capacity(resp.data.len());
        let mut skipped = 0usize;
        for raw in resp.data {
            let ts = raw.timestamp.clone();
            match raw.into_reading(self.cfg.local_offset) {
                Ok(r) => readings.push(r),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(timestamp = %ts, error = %e, "unparseable history timestamp");
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "history rows with unparseable timestamps were skipped");
        }
        tracing::info!(window, reported, loaded = readings.len(), "history loaded");

        Some(readings)
    }
}
