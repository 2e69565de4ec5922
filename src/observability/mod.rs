//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay handler, connection tasks
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request IDs live in log spans only; they are never added to relayed headers
//! - Metrics are cheap and disabled by default

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
