use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use farm_client::domain::SensorSnapshot;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::observers::ObserverRegistry;

/// Where polled snapshots come from.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// `None` means this poll produced no data; the source logs the reason.
    async fn fetch(&self) -> Option<SensorSnapshot>;
}

/// What to do when a tick fires while the previous fetch is unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    #[default]
    Skip,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            overlap: OverlapPolicy::Skip,
        }
    }
}

struct Shared<S> {
    source: S,
    observers: Arc<ObserverRegistry>,
    last: Mutex<Option<SensorSnapshot>>,
    in_flight: AtomicUsize,
}

/// Counts a fetch as in flight for as long as it lives.
struct InFlight<S> {
    shared: Arc<Shared<S>>,
}

impl<S> InFlight<S> {
    fn enter(shared: Arc<Shared<S>>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        Self { shared }
    }
}

impl<S> Drop for InFlight<S> {
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<S: SnapshotSource> Shared<S> {
    async fn poll_once(&self) -> Option<SensorSnapshot> {
        metrics::counter!("farm_polls_total").increment(1);

        let Some(snapshot) = self.source.fetch().await else {
            metrics::counter!("farm_poll_failures_total").increment(1);
            tracing::debug!("poll returned no data, keeping last snapshot");
            return None;
        };

        *self.last.lock() = Some(snapshot.clone());
        let report = self.observers.notify(&snapshot);
        tracing::debug!(
            delivered = report.delivered,
            failed = report.failed,
            "snapshot broadcast"
        );
        Some(snapshot)
    }
}

struct Running {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Fetches on a fixed interval and broadcasts each result to the registry.
pub struct Poller<S> {
    shared: Arc<Shared<S>>,
    policy: PollPolicy,
    running: Mutex<Option<Running>>,
}

impl<S: SnapshotSource + 'static> Poller<S> {
    pub fn new(source: S, observers: Arc<ObserverRegistry>, policy: PollPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                observers,
                last: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
            }),
            policy,
            running: Mutex::new(None),
        }
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.shared.observers
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Last successful snapshot; failed polls leave it untouched.
    pub fn last_snapshot(&self) -> Option<SensorSnapshot> {
        self.shared.last.lock().clone()
    }

    /// One fetch-and-broadcast, outside the schedule.
    pub async fn refresh(&self) -> Option<SensorSnapshot> {
        let _guard = InFlight::enter(self.shared.clone());
        self.shared.poll_once().await
    }

    /// Fetches immediately, then once per interval. Returns `false` without
    /// scheduling anything when already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::warn!("poller is already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_schedule(
            self.shared.clone(),
            self.policy,
            cancel.clone(),
        ));
        *running = Some(Running {
            cancel,
            _handle: handle,
        });

        tracing::info!(
            interval_ms = self.policy.interval.as_millis() as u64,
            overlap = ?self.policy.overlap,
            "poller started"
        );
        true
    }

    /// Cancels future ticks. A fetch already in flight runs to completion.
    pub fn stop(&self) -> bool {
        let Some(running) = self.running.lock().take() else {
            return false;
        };
        running.cancel.cancel();
        tracing::info!("poller stopped");
        true
    }
}

impl<S> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

async fn run_schedule<S: SnapshotSource + 'static>(
    shared: Arc<Shared<S>>,
    policy: PollPolicy,
    cancel: CancellationToken,
) {
    // The first tick completes immediately.
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if policy.overlap == OverlapPolicy::Skip && shared.in_flight.load(Ordering::Acquire) > 0 {
            metrics::counter!("farm_poll_skipped_total").increment(1);
            tracing::warn!("previous poll still in flight, skipping tick");
            continue;
        }

        // Spawned so the timer keeps its cadence regardless of fetch latency.
        let guard = InFlight::enter(shared.clone());
        tokio::spawn(async move {
            guard.shared.poll_once().await;
            drop(guard);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::{ChannelObserver, FnObserver};
    use std::collections::BTreeMap;
    use time::OffsetDateTime;

    struct CountingSource {
        calls: AtomicUsize,
        latency: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new(latency: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                latency,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Duration::ZERO)
            }
        }
    }

    #[async_trait::async_trait]
    impl SnapshotSource for Arc<CountingSource> {
        async fn fetch(&self) -> Option<SensorSnapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail {
                return None;
            }
            Some(SensorSnapshot {
                fetched_at: OffsetDateTime::UNIX_EPOCH,
                values: BTreeMap::from([("indoor_temp".to_string(), Some(n as f64))]),
            })
        }
    }

    fn policy(secs: u64, overlap: OverlapPolicy) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(secs),
            overlap,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_a_single_timer() {
        let source = Arc::new(CountingSource::new(Duration::ZERO));
        let poller = Poller::new(
            source.clone(),
            Arc::new(ObserverRegistry::new()),
            policy(10, OverlapPolicy::Skip),
        );

        assert!(poller.start());
        assert!(!poller.start());
        assert!(poller.is_running());

        // Immediate fetch plus the 10s tick.
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        assert!(poller.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_future_fetches() {
        let source = Arc::new(CountingSource::new(Duration::ZERO));
        let poller = Poller::new(
            source.clone(),
            Arc::new(ObserverRegistry::new()),
            policy(10, OverlapPolicy::Skip),
        );

        poller.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(poller.stop());
        assert!(!poller.stop());
        assert!(!poller.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_does_not_abort_in_flight_fetch() {
        let source = Arc::new(CountingSource::new(Duration::from_secs(3)));
        let registry = Arc::new(ObserverRegistry::new());
        let (obs, mut rx) = ChannelObserver::new("chan", 4);
        registry.register(Arc::new(obs));
        let poller = Poller::new(source.clone(), registry, policy(10, OverlapPolicy::Skip));

        poller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(poller.in_flight(), 1);
        poller.stop();

        let snap = rx.recv().await.expect("in-flight fetch still delivers");
        assert_eq!(snap.get("indoor_temp"), Some(1.0));
        assert_eq!(poller.last_snapshot(), Some(snap));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_drops_ticks_while_fetch_is_slow() {
        let source = Arc::new(CountingSource::new(Duration::from_secs(25)));
        let poller = Poller::new(
            source.clone(),
            Arc::new(ObserverRegistry::new()),
            policy(10, OverlapPolicy::Skip),
        );

        poller.start();
        // Ticks at 0, 10, 20, 30: the first fetch resolves at 25, so 10 and 20 are skipped.
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn allow_policy_overlaps_fetches() {
        let source = Arc::new(CountingSource::new(Duration::from_secs(25)));
        let poller = Poller::new(
            source.clone(),
            Arc::new(ObserverRegistry::new()),
            policy(10, OverlapPolicy::Allow),
        );

        poller.start();
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert!(poller.in_flight() >= 2);
        poller.stop();
    }

    #[tokio::test]
    async fn refresh_broadcasts_and_failed_poll_keeps_last_snapshot() {
        let registry = Arc::new(ObserverRegistry::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        registry.register(Arc::new(FnObserver::new("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })));

        let poller = Poller::new(
            Arc::new(CountingSource::new(Duration::ZERO)),
            registry.clone(),
            PollPolicy::default(),
        );
        let snap = poller.refresh().await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(poller.last_snapshot(), Some(snap.clone()));
        assert_eq!(poller.in_flight(), 0);

        let failing = Poller::new(
            Arc::new(CountingSource::failing()),
            registry,
            PollPolicy::default(),
        );
        assert!(failing.refresh().await.is_none());
        assert!(failing.last_snapshot().is_none());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
