//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper HTTP/1 + Axum router, /health or relay)
//!     → request.rs (extract ?url=, build outbound request, filter headers)
//!     → transport.rs (fresh client, send, wait for response head)
//!     → response.rs (status + headers verbatim, stream body)
//!     → Send to client
//! ```
//! Failures at any step become an `error::RelayError` with a fixed response.

pub mod error;
pub mod health;
pub mod request;
pub mod response;
pub mod server;
pub mod transport;

pub use error::{RelayError, UpstreamFailure};
pub use request::{build_outbound_request, extract_target_url, OutboundRequest};
pub use response::stream_response;
pub use server::HttpServer;
pub use transport::Transport;
