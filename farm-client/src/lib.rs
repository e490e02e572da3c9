pub mod api;
pub mod domain;
pub mod error;
pub mod keys;

pub use api::{ApiConfig, Endpoints, FarmClient};
pub use error::ClientError;
pub use keys::{KeyMapping, KeyMappingError};
