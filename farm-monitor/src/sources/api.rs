use std::sync::Arc;

use farm_client::{domain::SensorSnapshot, FarmClient};

use super::RetryPolicy;
use crate::poller::SnapshotSource;

/// Polls `/api/sensors/all` through the shared client.
#[derive(Clone)]
pub struct ApiSensorSource {
    client: Arc<FarmClient>,
    retry: RetryPolicy,
}

impl ApiSensorSource {
    pub fn new(client: Arc<FarmClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn client(&self) -> &Arc<FarmClient> {
        &self.client
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ApiSensorSource {
    async fn fetch(&self) -> Option<SensorSnapshot> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            if let Some(snapshot) = self.client.all_sensors().await {
                return Some(snapshot);
            }
            if attempt >= max_attempts {
                return None;
            }

            let sleep_for = self.retry.delay * attempt;
            tracing::warn!(
                attempt,
                max_attempts,
                backoff_ms = sleep_for.as_millis() as u64,
                "sensor poll failed, retrying with backoff"
            );
            tokio::time::sleep(sleep_for).await;
            attempt += 1;
        }
    }
}
