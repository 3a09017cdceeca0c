//! Authenticated reverse proxy for a grants portal's upstream data API.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod token;

pub use client::{ApiClient, ClientConfig};
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
