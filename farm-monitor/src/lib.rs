pub mod aggregate;
pub mod auth;
pub mod cameras;
pub mod charts;
pub mod config;
pub mod control;
pub mod metrics_server;
pub mod observability;
pub mod observers;
pub mod poller;
pub mod sources;

pub use aggregate::{aggregate_hourly, HourlySeries, SeriesPoint};
pub use observers::{Observer, ObserverRegistry};
pub use poller::{OverlapPolicy, PollPolicy, Poller, SnapshotSource};
