#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("{resource} reported failure: {reason}")]
    Rejected { resource: String, reason: String },
    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl ClientError {
    /// Application-level failure inside an otherwise successful HTTP exchange.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
