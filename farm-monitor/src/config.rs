use std::{collections::BTreeMap, fs, time::Duration};

use farm_client::{ApiConfig, Endpoints, KeyMapping, KeyMappingError};
use serde::Deserialize;
use time::{macros::format_description, UtcOffset};

use crate::aggregate::DEFAULT_TRACKED_KEYS;
use crate::auth::Credentials;
use crate::poller::{OverlapPolicy, PollPolicy};
use crate::sources::RetryPolicy;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid key mapping: {0}")]
    KeyMapping(#[from] KeyMappingError),
    #[error("invalid utc_offset '{0}', expected e.g. \"+09:00\"")]
    Offset(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            overlap: OverlapPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default = "default_tracked_keys")]
    pub tracked_keys: Vec<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            tracked_keys: default_tracked_keys(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiSection,
    /// Replaces the built-in sensor table when present.
    #[serde(default)]
    pub sensor_keys: Option<BTreeMap<String, String>>,
    /// Replaces the built-in setting table when present.
    #[serde(default)]
    pub setting_keys: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    pub auth: Option<Credentials>,
    #[serde(default)]
    pub cameras: BTreeMap<String, String>,
    pub metrics: Option<MetricsConfig>,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_window() -> String {
    "24h".to_string()
}

fn default_tracked_keys() -> Vec<String> {
    DEFAULT_TRACKED_KEYS.iter().map(|k| k.to_string()).collect()
}

pub fn parse_utc_offset(s: &str) -> Result<UtcOffset, ConfigError> {
    UtcOffset::parse(
        s.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ConfigError::Offset(s.to_string()))
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        use std::env;

        let path =
            env::var("FARM_MONITOR_CONFIG").unwrap_or_else(|_| "farm-monitor.toml".to_string());
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Zero("polling.interval_ms"));
        }
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::Zero("api.timeout_ms"));
        }
        self.api_config().map(|_| ())
    }

    pub fn api_config(&self) -> Result<ApiConfig, ConfigError> {
        let sensor_keys = match &self.sensor_keys {
            Some(table) => KeyMapping::new(table.clone())?,
            None => KeyMapping::default_sensors()?,
        };
        let setting_keys = match &self.setting_keys {
            Some(table) => KeyMapping::new(table.clone())?,
            None => KeyMapping::default_settings()?,
        };

        Ok(ApiConfig {
            base_url: self.api.base_url.clone(),
            endpoints: self.api.endpoints.clone(),
            timeout: Duration::from_millis(self.api.timeout_ms),
            sensor_keys,
            setting_keys,
            local_offset: parse_utc_offset(&self.api.utc_offset)?,
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.polling.interval_ms),
            overlap: self.polling.overlap,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.api.retry.max_attempts,
            delay: Duration::from_millis(self.api.retry.delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    const MINIMAL: &str = r#"
        [api]
        base_url = "http://192.168.0.14:8000"
    "#;

    #[test]
    fn minimal_config_uses_dashboard_defaults() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();

        let policy = cfg.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.overlap, OverlapPolicy::Skip);

        let retry = cfg.retry_policy();
        assert_eq!(retry.max_attempts, 1);

        assert_eq!(cfg.history.window, "24h");
        assert_eq!(cfg.history.tracked_keys.len(), DEFAULT_TRACKED_KEYS.len());
        assert!(cfg.auth.is_none());

        let api = cfg.api_config().unwrap();
        assert_eq!(api.timeout, Duration::from_secs(5));
        assert_eq!(api.endpoints, Endpoints::default());
        assert_eq!(api.sensor_keys.to_api("indoor_temp"), "indoor_current_temperature");
        assert_eq!(api.local_offset, UtcOffset::UTC);
    }

    #[test]
    fn full_config_overrides_everything() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [api]
            base_url = "http://farm.local:8000"
            timeout_ms = 2000
            utc_offset = "+09:00"

            [api.endpoints]
            history = "/api/v2/history"

            [api.retry]
            max_attempts = 3
            delay_ms = 250

            [sensor_keys]
            indoor_temp = "greenhouse_temperature"

            [polling]
            interval_ms = 30000
            overlap = "allow"

            [history]
            window = "12h"
            tracked_keys = ["indoor_temp_1"]

            [auth]
            username = "grower"
            password = "tomato"

            [cameras]
            entrance = "rtsp://10.0.0.5/stream1"
            center = ""

            [metrics]
            bind_addr = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        let api = cfg.api_config().unwrap();
        assert_eq!(api.local_offset, offset!(+9));
        assert_eq!(api.endpoints.history, "/api/v2/history");
        assert_eq!(api.endpoints.health, "/health");
        assert_eq!(api.sensor_keys.len(), 1);
        assert_eq!(api.sensor_keys.to_api("indoor_temp"), "greenhouse_temperature");

        assert_eq!(cfg.poll_policy().overlap, OverlapPolicy::Allow);
        assert_eq!(cfg.retry_policy().delay, Duration::from_millis(250));
        assert_eq!(cfg.history.tracked_keys, vec!["indoor_temp_1".to_string()]);
        assert_eq!(cfg.auth.as_ref().map(|a| a.username.as_str()), Some("grower"));
        assert_eq!(cfg.cameras.len(), 2);
        assert!(cfg.metrics.is_some());
    }

    #[test]
    fn duplicate_mapping_target_fails_validation() {
        let err = AppConfig::from_toml_str(
            r#"
            [api]
            base_url = "http://farm.local:8000"

            [sensor_keys]
            indoor_wind_dir = "wind_direction"
            outdoor_wind_dir = "wind_direction"
            "#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::KeyMapping(KeyMappingError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn zero_interval_and_bad_offset_are_rejected() {
        let zero = format!("{MINIMAL}\n[polling]\ninterval_ms = 0\n");
        assert!(matches!(
            AppConfig::from_toml_str(&zero),
            Err(ConfigError::Zero("polling.interval_ms"))
        ));

        let bad_offset = r#"
            [api]
            base_url = "http://farm.local:8000"
            utc_offset = "KST"
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(bad_offset),
            Err(ConfigError::Offset(_))
        ));
    }

    #[test]
    fn offsets_parse_with_explicit_sign() {
        assert_eq!(parse_utc_offset("+09:00").unwrap(), offset!(+9));
        assert_eq!(parse_utc_offset("-03:30").unwrap(), offset!(-3:30));
        assert!(parse_utc_offset("09:00").is_err());
    }
}
