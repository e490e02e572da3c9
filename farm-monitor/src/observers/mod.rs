pub mod channel;
pub mod live_board;

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use farm_client::domain::SensorSnapshot;
use parking_lot::RwLock;

pub use channel::ChannelObserver;
pub use live_board::LiveBoard;

/// Receives every successful poll result.
pub trait Observer: Send + Sync {
    fn name(&self) -> &str;

    fn on_update(&self, snapshot: &SensorSnapshot) -> anyhow::Result<()>;
}

/// Adapts a closure into an [`Observer`].
pub struct FnObserver<F> {
    name: String,
    f: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&SensorSnapshot) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(&SensorSnapshot) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&self, snapshot: &SensorSnapshot) -> anyhow::Result<()> {
        (self.f)(snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered list of observers with isolated dispatch.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn Observer>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(observer = observer.name(), "observer registered");
        self.observers.write().push((id, observer));
        id
    }

    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Calls every observer in registration order. An observer that errors or
    /// panics is logged and skipped; the rest still run.
    pub fn notify(&self, snapshot: &SensorSnapshot) -> NotifyReport {
        // Dispatch over a copy so observers may (un)register while being called.
        let observers: Vec<Arc<dyn Observer>> =
            self.observers.read().iter().map(|(_, o)| o.clone()).collect();

        let mut report = NotifyReport::default();
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_update(snapshot))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    metrics::counter!("farm_observer_errors_total").increment(1);
                    tracing::error!(observer = observer.name(), error = %e, "observer failed");
                }
                Err(_) => {
                    report.failed += 1;
                    metrics::counter!("farm_observer_errors_total").increment(1);
                    tracing::error!(observer = observer.name(), "observer panicked");
                }
            }
        }
        report
    }
}
