//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → headers.rs (drop X-Forwarded-*, X-Real-IP; pin Host to the target)
//!     → Outbound request
//! ```
//!
//! # Design Decisions
//! - The caller's address never reaches the origin through proxy headers
//! - No trust in a caller-supplied Host

pub mod headers;

pub use headers::{filter_headers, DENIED_HEADERS};
