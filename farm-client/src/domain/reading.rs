use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

/// A single timestamped row of sensor values.
///
/// Values that were not numeric on the wire are kept as `None` so callers can
/// tell "column present but unusable" apart from "column missing".
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub ts: OffsetDateTime,
    pub values: BTreeMap<String, Option<f64>>,
}

impl Reading {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }
}

/// History row as served by `/api/history/{window}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl RawReading {
    /// Naive timestamps are interpreted in `local_offset`.
    pub fn into_reading(self, local_offset: UtcOffset) -> Result<Reading, time::error::Parse> {
        let ts = parse_timestamp(&self.timestamp, local_offset)?;
        let values = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), numeric_value(v)))
            .collect();
        Ok(Reading { ts, values })
    }
}

/// Numbers and numeric strings count; everything else does not.
pub fn numeric_value(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub fn parse_timestamp(s: &str, local_offset: UtcOffset) -> Result<OffsetDateTime, time::error::Parse> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts);
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ];

    let mut last_err = None;
    for fmt in naive_formats {
        match PrimitiveDateTime::parse(s, fmt) {
            Ok(dt) => return Ok(dt.assume_offset(local_offset)),
            Err(e) => last_err = Some(e),
        }
    }

    // The array is non-empty, so at least one error was recorded.
    match last_err {
        Some(e) => Err(e),
        None => OffsetDateTime::parse(s, &Rfc3339),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{datetime, offset};

    #[test]
    fn numeric_value_accepts_numbers_and_numeric_strings() {
        assert_eq!(numeric_value(&json!(20)), Some(20.0));
        assert_eq!(numeric_value(&json!(21.5)), Some(21.5));
        assert_eq!(numeric_value(&json!(" 22.25 ")), Some(22.25));
    }

    #[test]
    fn numeric_value_rejects_everything_else() {
        assert_eq!(numeric_value(&json!("bad")), None);
        assert_eq!(numeric_value(&json!(null)), None);
        assert_eq!(numeric_value(&json!(true)), None);
        assert_eq!(numeric_value(&json!({"value": 1})), None);
        assert_eq!(numeric_value(&json!("NaN")), None);
    }

    #[test]
    fn naive_timestamps_take_the_local_offset() {
        let ts = parse_timestamp("2024-12-09 00:10:00", offset!(+9)).unwrap();
        assert_eq!(ts, datetime!(2024-12-09 00:10:00 +9));

        let ts = parse_timestamp("2024-12-09T05:00:00.250", offset!(+9)).unwrap();
        assert_eq!(ts.hour(), 5);
        assert_eq!(ts.offset(), offset!(+9));
    }

    #[test]
    fn rfc3339_timestamps_keep_their_own_offset() {
        let ts = parse_timestamp("2024-12-09T00:10:00Z", offset!(+9)).unwrap();
        assert_eq!(ts, datetime!(2024-12-09 00:10:00 UTC));
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday-ish", offset!(UTC)).is_err());
    }

    #[test]
    fn raw_reading_flattens_sensor_columns() {
        let raw: RawReading = serde_json::from_value(json!({
            "timestamp": "2024-12-09 00:10:00",
            "indoor_temp_1": 20,
            "outdoor_temp": "bad"
        }))
        .unwrap();

        let reading = raw.into_reading(offset!(UTC)).unwrap();
        assert_eq!(reading.value("indoor_temp_1"), Some(20.0));
        assert_eq!(reading.value("outdoor_temp"), None);
        assert!(reading.values.contains_key("outdoor_temp"));
        assert!(!reading.values.contains_key("timestamp"));
    }
}
