use std::collections::{BTreeMap, BTreeSet};

use farm_client::domain::Reading;
use serde::Serialize;
use time::UtcOffset;

/// History columns charted by default.
pub const DEFAULT_TRACKED_KEYS: &[&str] = &[
    "indoor_temp_1",
    "indoor_temp_2",
    "indoor_humidity",
    "indoor_solar",
    "indoor_soil_tension",
    "outdoor_temp",
    "outdoor_humidity",
    "outdoor_solar",
    "outdoor_wind_dir",
    "outdoor_wind_speed",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub hour: u8,
    pub value: f64,
}

/// Hour-of-day buckets shared by all tracked keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlySeries {
    /// Every hour present in the input, ascending.
    pub hours: Vec<u8>,
    /// Per key, only hours that had at least one numeric value.
    pub series: BTreeMap<String, Vec<SeriesPoint>>,
}

pub fn hour_label(hour: u8) -> String {
    format!("{hour}시")
}

impl HourlySeries {
    pub fn labels(&self) -> Vec<String> {
        self.hours.iter().copied().map(hour_label).collect()
    }

    pub fn points(&self, key: &str) -> &[SeriesPoint] {
        self.series.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn means(&self, key: &str) -> Vec<f64> {
        self.points(key).iter().map(|p| p.value).collect()
    }

    /// The key's means projected onto [`Self::hours`], `None` where the key
    /// had no value for that hour.
    pub fn aligned(&self, key: &str) -> Vec<Option<f64>> {
        let by_hour: BTreeMap<u8, f64> = self
            .points(key)
            .iter()
            .map(|p| (p.hour, p.value))
            .collect();
        self.hours.iter().map(|h| by_hour.get(h).copied()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u32,
}

/// Buckets readings by hour of day in `offset` and averages each tracked key.
///
/// Only numeric values contribute to a mean; an hour whose values for a key
/// are all missing is left out of that key's series.
pub fn aggregate_hourly<K: AsRef<str>>(
    readings: &[Reading],
    tracked_keys: &[K],
    offset: UtcOffset,
) -> HourlySeries {
    let mut hours = BTreeSet::new();
    let mut buckets: BTreeMap<&str, BTreeMap<u8, Accumulator>> = tracked_keys
        .iter()
        .map(|k| (k.as_ref(), BTreeMap::new()))
        .collect();

    for reading in readings {
        let hour = reading.ts.to_offset(offset).hour();
        hours.insert(hour);

        for (key, per_hour) in buckets.iter_mut() {
            if let Some(v) = reading.value(key) {
                let acc = per_hour.entry(hour).or_default();
                acc.sum += v;
                acc.count += 1;
            }
        }
    }

    let series = buckets
        .into_iter()
        .map(|(key, per_hour)| {
            let points = per_hour
                .into_iter()
                .filter(|(_, acc)| acc.count > 0)
                .map(|(hour, acc)| SeriesPoint {
                    hour,
                    value: acc.sum / f64::from(acc.count),
                })
                .collect();
            (key.to_string(), points)
        })
        .collect();

    HourlySeries {
        hours: hours.into_iter().collect(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_client::domain::RawReading;
    use serde_json::json;
    use time::macros::{datetime, offset};

    fn reading(ts: time::OffsetDateTime, values: &[(&str, Option<f64>)]) -> Reading {
        Reading {
            ts,
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn from_json(rows: serde_json::Value) -> Vec<Reading> {
        let rows: Vec<RawReading> = serde_json::from_value(rows).unwrap();
        rows.into_iter()
            .map(|r| r.into_reading(UtcOffset::UTC).unwrap())
            .collect()
    }

    #[test]
    fn groups_by_hour_and_averages() {
        let readings = from_json(json!([
            {"timestamp": "2024-12-09 00:10:00", "indoor_temp_1": 20},
            {"timestamp": "2024-12-09 00:50:00", "indoor_temp_1": 22},
            {"timestamp": "2024-12-09 05:00:00", "indoor_temp_1": 18}
        ]));

        let s = aggregate_hourly(&readings, &["indoor_temp_1"], UtcOffset::UTC);

        assert_eq!(s.labels(), vec!["0시", "5시"]);
        assert_eq!(s.means("indoor_temp_1"), vec![21.0, 18.0]);
    }

    #[test]
    fn non_numeric_values_do_not_count() {
        let readings = from_json(json!([
            {"timestamp": "2024-12-09 07:00:00", "outdoor_temp": 20},
            {"timestamp": "2024-12-09 07:20:00", "outdoor_temp": "bad"},
            {"timestamp": "2024-12-09 07:40:00", "outdoor_temp": "22"}
        ]));

        let s = aggregate_hourly(&readings, &["outdoor_temp"], UtcOffset::UTC);
        assert_eq!(s.means("outdoor_temp"), vec![21.0]);
    }

    #[test]
    fn empty_input_gives_empty_series_for_each_key() {
        let s = aggregate_hourly(&[], DEFAULT_TRACKED_KEYS, UtcOffset::UTC);

        assert!(s.is_empty());
        assert!(s.labels().is_empty());
        assert_eq!(s.series.len(), DEFAULT_TRACKED_KEYS.len());
        assert!(s.series.values().all(Vec::is_empty));
    }

    #[test]
    fn hours_without_values_are_omitted_per_key() {
        let readings = vec![
            reading(datetime!(2024-12-09 01:00 UTC), &[("a", Some(1.0)), ("b", None)]),
            reading(datetime!(2024-12-09 02:00 UTC), &[("a", Some(2.0)), ("b", Some(5.0))]),
            reading(datetime!(2024-12-09 03:00 UTC), &[("a", Some(3.0))]),
        ];

        let s = aggregate_hourly(&readings, &["a", "b"], UtcOffset::UTC);

        assert_eq!(s.hours, vec![1, 2, 3]);
        assert_eq!(s.means("a").len(), 3);
        assert_eq!(s.points("b"), &[SeriesPoint { hour: 2, value: 5.0 }]);
        assert_eq!(s.aligned("b"), vec![None, Some(5.0), None]);
    }

    #[test]
    fn labels_are_ascending_and_unique_regardless_of_input_order() {
        let readings = vec![
            reading(datetime!(2024-12-09 23:30 UTC), &[("t", Some(1.0))]),
            reading(datetime!(2024-12-09 04:00 UTC), &[("t", Some(1.0))]),
            reading(datetime!(2024-12-10 04:45 UTC), &[("t", Some(3.0))]),
            reading(datetime!(2024-12-09 12:00 UTC), &[("t", Some(1.0))]),
        ];

        let s = aggregate_hourly(&readings, &["t"], UtcOffset::UTC);

        assert_eq!(s.labels(), vec!["4시", "12시", "23시"]);
        assert_eq!(s.means("t"), vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn hours_follow_the_given_offset() {
        let readings = vec![reading(datetime!(2024-12-09 15:30 UTC), &[("t", Some(9.0))])];

        let s = aggregate_hourly(&readings, &["t"], offset!(+9));
        assert_eq!(s.labels(), vec!["0시"]);
    }

    #[test]
    fn same_input_same_output() {
        let readings = from_json(json!([
            {"timestamp": "2024-12-09T08:15:00", "indoor_humidity": 61.5, "outdoor_solar": null},
            {"timestamp": "2024-12-09T09:15:00", "indoor_humidity": 63, "outdoor_solar": 410}
        ]));

        let a = aggregate_hourly(&readings, DEFAULT_TRACKED_KEYS, UtcOffset::UTC);
        let b = aggregate_hourly(&readings, DEFAULT_TRACKED_KEYS, UtcOffset::UTC);
        assert_eq!(a, b);
    }
}
