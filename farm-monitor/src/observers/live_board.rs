use std::collections::BTreeMap;

use farm_client::domain::SensorSnapshot;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::Observer;

/// (UI key, label, unit suffix) for every live card.
pub const CARDS: &[(&str, &str, &str)] = &[
    ("indoor_temp", "Indoor temperature", "℃"),
    ("indoor_humidity", "Indoor humidity", "%"),
    ("indoor_solar", "Indoor solar radiation", " W/㎡"),
    ("indoor_moisture", "Soil moisture", "%"),
    ("indoor_soil_tension", "Soil tension", " kPa"),
    ("outdoor_temp", "Outdoor temperature", "℃"),
    ("outdoor_humidity", "Outdoor humidity", "%"),
    ("outdoor_solar", "Outdoor solar radiation", " W/㎡"),
    ("outdoor_wind_dir", "Wind direction", ""),
    ("outdoor_wind_speed", "Wind speed", " m/s"),
];

#[derive(Default)]
struct BoardState {
    cards: BTreeMap<&'static str, String>,
    last_update: Option<OffsetDateTime>,
}

/// Text rendering of the latest sensor values.
///
/// A card only changes when the new value is usable; a missing or null value
/// leaves the previous text on screen.
#[derive(Default)]
pub struct LiveBoard {
    state: Mutex<BoardState>,
}

impl LiveBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many cards changed text.
    pub fn apply(&self, snapshot: &SensorSnapshot) -> usize {
        let mut state = self.state.lock();
        let mut changed = 0;

        for (key, _, unit) in CARDS {
            let Some(value) = snapshot.get(key).filter(|v| v.is_finite()) else {
                continue;
            };
            let text = format!("{value}{unit}");
            if state.cards.get(key) != Some(&text) {
                state.cards.insert(*key, text);
                changed += 1;
            }
        }

        state.last_update = Some(snapshot.fetched_at);
        changed
    }

    pub fn card(&self, key: &str) -> Option<String> {
        self.state.lock().cards.get(key).cloned()
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.state.lock().last_update
    }

    /// One line per card; cards never filled show `--`.
    pub fn render(&self) -> String {
        let state = self.state.lock();
        CARDS
            .iter()
            .map(|(key, label, _)| {
                let text = state.cards.get(key).map(String::as_str).unwrap_or("--");
                format!("{label}: {text}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Observer for LiveBoard {
    fn name(&self) -> &str {
        "live_board"
    }

    fn on_update(&self, snapshot: &SensorSnapshot) -> anyhow::Result<()> {
        let changed = self.apply(snapshot);
        tracing::info!(changed, fetched_at = %snapshot.fetched_at, "live values refreshed");
        tracing::debug!("\n{}", self.render());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn snap(values: &[(&str, Option<f64>)]) -> SensorSnapshot {
        SensorSnapshot {
            fetched_at: datetime!(2024-12-09 10:00:00 UTC),
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn renders_values_with_units() {
        let board = LiveBoard::new();
        let changed = board.apply(&snap(&[
            ("indoor_temp", Some(23.5)),
            ("indoor_solar", Some(410.0)),
            ("outdoor_wind_dir", Some(270.0)),
        ]));

        assert_eq!(changed, 3);
        assert_eq!(board.card("indoor_temp").as_deref(), Some("23.5℃"));
        assert_eq!(board.card("indoor_solar").as_deref(), Some("410 W/㎡"));
        assert_eq!(board.card("outdoor_wind_dir").as_deref(), Some("270"));
    }

    #[test]
    fn unusable_values_keep_last_known_good() {
        let board = LiveBoard::new();
        board.apply(&snap(&[("indoor_temp", Some(23.5)), ("outdoor_wind_speed", Some(1.2))]));

        let changed = board.apply(&snap(&[
            ("indoor_temp", None),
            ("outdoor_wind_speed", Some(f64::NAN)),
        ]));

        assert_eq!(changed, 0);
        assert_eq!(board.card("indoor_temp").as_deref(), Some("23.5℃"));
        assert_eq!(board.card("outdoor_wind_speed").as_deref(), Some("1.2 m/s"));
    }

    #[test]
    fn render_marks_empty_cards() {
        let board = LiveBoard::new();
        board.apply(&snap(&[("indoor_humidity", Some(61.0))]));

        let text = board.render();
        assert!(text.contains("Indoor humidity: 61%"));
        assert!(text.contains("Indoor temperature: --"));
        assert_eq!(text.lines().count(), CARDS.len());
        assert!(board.last_update().is_some());
    }
}
