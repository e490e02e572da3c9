use farm_client::domain::SensorSnapshot;
use tokio::sync::mpsc;

use super::Observer;

/// Hands snapshots to an async consumer. Never blocks the dispatching poll:
/// a full or closed channel is reported as an observer error.
pub struct ChannelObserver {
    name: String,
    tx: mpsc::Sender<SensorSnapshot>,
}

impl ChannelObserver {
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<SensorSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl Observer for ChannelObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&self, snapshot: &SensorSnapshot) -> anyhow::Result<()> {
        self.tx
            .try_send(snapshot.clone())
            .map_err(|e| anyhow::anyhow!("snapshot channel unavailable: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn snapshot(v: f64) -> SensorSnapshot {
        SensorSnapshot {
            fetched_at: datetime!(2024-12-09 10:00:00 UTC),
            values: BTreeMap::from([("indoor_temp".to_string(), Some(v))]),
        }
    }

    #[tokio::test]
    async fn forwards_until_full() {
        let (obs, mut rx) = ChannelObserver::new("chan", 1);

        obs.on_update(&snapshot(20.0)).unwrap();
        assert!(obs.on_update(&snapshot(21.0)).is_err());

        let got = rx.recv().await.unwrap();
        assert_eq!(got.get("indoor_temp"), Some(20.0));
    }

    #[test]
    fn closed_receiver_is_an_error() {
        let (obs, rx) = ChannelObserver::new("chan", 4);
        drop(rx);
        assert!(obs.on_update(&snapshot(20.0)).is_err());
    }
}
