//! Transparent single-hop HTTP forwarding proxy.
//!
//! `GET /?url=<percent-encoded target>` is relayed to the target over a connection
//! opened for that request alone, and the origin's response is streamed back.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
