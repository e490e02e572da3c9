use std::collections::BTreeMap;

/// UI sensor key -> REST API sensor name.
pub const DEFAULT_SENSOR_KEYS: &[(&str, &str)] = &[
    ("indoor_temp", "indoor_current_temperature"),
    ("indoor_humidity", "indoor_current_humidity"),
    ("indoor_solar", "indoor_current_solar_radiation"),
    ("indoor_moisture", "indoor_current_moisture"),
    ("indoor_soil_tension", "indoor_current_soil_tension"),
    ("outdoor_temp", "outdoor_current_temperature"),
    ("outdoor_humidity", "outdoor_current_humidity"),
    ("outdoor_solar", "outdoor_solar_radiation"),
    ("outdoor_wind_dir", "indoor_wind_direction"),
    ("outdoor_wind_speed", "outdoor_wind_speed"),
];

/// UI setting key -> REST API setting name.
pub const DEFAULT_SETTING_KEYS: &[(&str, &str)] = &[
    ("dehumidifier_auto", "dehumidifier_auto_mode"),
    ("circulation_fan_auto", "circulation_fan_auto_mode"),
    ("heating_auto", "heating_auto_mode"),
    ("irrigation_auto", "irrigation_auto_mode"),
    ("lighting_auto", "lighting_auto_mode"),
    ("heating_on_temp", "heating_on_temperature_setting"),
    ("heating_off_temp", "heating_off_temperature_setting"),
    ("circulation_fan_on_temp", "circulation_fan_on_temperature"),
    ("circulation_fan_off_temp", "circulation_fan_off_temperature"),
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyMappingError {
    #[error("duplicate target key '{api_key}': mapped from both '{first}' and '{second}'")]
    DuplicateTarget {
        api_key: String,
        first: String,
        second: String,
    },
    #[error("empty key in mapping entry '{ui_key}' -> '{api_key}'")]
    EmptyKey { ui_key: String, api_key: String },
}

/// Injective association between UI-facing keys and API-facing names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMapping {
    forward: BTreeMap<String, String>,
    reverse: BTreeMap<String, String>,
}

impl KeyMapping {
    pub fn new<I, K, V>(pairs: I) -> Result<Self, KeyMappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::default();

        for (ui_key, api_key) in pairs {
            let ui_key = ui_key.into();
            let api_key = api_key.into();

            if ui_key.trim().is_empty() || api_key.trim().is_empty() {
                return Err(KeyMappingError::EmptyKey { ui_key, api_key });
            }

            if let Some(first) = mapping.reverse.get(&api_key) {
                if *first != ui_key {
                    return Err(KeyMappingError::DuplicateTarget {
                        api_key,
                        first: first.clone(),
                        second: ui_key,
                    });
                }
            }

            // A UI key listed twice: the later target wins, the earlier one is unlinked.
            if let Some(old_target) = mapping.forward.insert(ui_key.clone(), api_key.clone()) {
                mapping.reverse.remove(&old_target);
            }
            mapping.reverse.insert(api_key, ui_key);
        }

        Ok(mapping)
    }

    pub fn default_sensors() -> Result<Self, KeyMappingError> {
        Self::new(DEFAULT_SENSOR_KEYS.iter().copied())
    }

    pub fn default_settings() -> Result<Self, KeyMappingError> {
        Self::new(DEFAULT_SETTING_KEYS.iter().copied())
    }

    /// Falls back to the key itself when it is not mapped.
    pub fn to_api<'a>(&'a self, ui_key: &'a str) -> &'a str {
        self.forward.get(ui_key).map(String::as_str).unwrap_or(ui_key)
    }

    pub fn to_ui(&self, api_key: &str) -> Option<&str> {
        self.reverse.get(api_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
