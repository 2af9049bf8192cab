pub mod config;
pub mod http;
pub mod normalize;

pub use config::ClientConfig;
pub use http::{ApiClient, ClientError};
