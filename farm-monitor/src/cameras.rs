use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    NoSignal,
    Configured(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFeed {
    pub channel: String,
    pub status: FeedStatus,
}

/// One feed per `[cameras]` entry, in channel order. A blank URL means no signal.
pub fn camera_feeds(cameras: &BTreeMap<String, String>) -> Vec<CameraFeed> {
    cameras
        .iter()
        .map(|(channel, url)| {
            let url = url.trim();
            let status = if url.is_empty() {
                FeedStatus::NoSignal
            } else {
                FeedStatus::Configured(url.to_string())
            };
            CameraFeed {
                channel: channel.clone(),
                status,
            }
        })
        .collect()
}

pub fn log_feeds(feeds: &[CameraFeed]) {
    for feed in feeds {
        match &feed.status {
            FeedStatus::NoSignal => tracing::info!(channel = %feed.channel, "camera: no signal"),
            FeedStatus::Configured(url) => {
                tracing::info!(channel = %feed.channel, %url, "camera feed configured")
            }
        }
    }
}
