//! Outbound header policy.
//!
//! # Responsibilities
//! - Strip headers that identify the caller (X-Forwarded-*, X-Real-IP)
//! - Pin `Host` to the target so the caller cannot steer routing with it
//!
//! # Design Decisions
//! - Deny-list, not allow-list: everything else is forwarded verbatim
//! - Multi-valued headers keep every value in arrival order

use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// Headers never forwarded to the origin. Matched case-insensitively.
pub const DENIED_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "x-real-ip",
    "x-forwarded-proto",
    "x-forwarded-host",
];

pub fn is_denied(name: &HeaderName) -> bool {
    DENIED_HEADERS
        .iter()
        .any(|denied| name.as_str().eq_ignore_ascii_case(denied))
}

/// Copy `inbound` minus the deny-list, then overwrite `Host` with the target's host.
pub fn filter_headers(inbound: &HeaderMap, target: &Url) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.keys_len());
    for (name, value) in inbound {
        if !is_denied(name) {
            outbound.append(name.clone(), value.clone());
        }
    }

    if let Some(host) = host_header(target) {
        outbound.insert(HOST, host);
    }
    outbound
}

/// Host component of the target, with the port when one is given explicitly.
pub fn host_header(target: &Url) -> Option<HeaderValue> {
    let host = target.host_str()?;
    let value = match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).ok()
}
