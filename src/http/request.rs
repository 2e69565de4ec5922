//! Inbound request translation.
//!
//! # Responsibilities
//! - Extract the target URL from the raw `url=` query string
//! - Validate the target before any network I/O
//! - Prepare the outbound request: method, filtered headers, streamed body
//!
//! # Design Decisions
//! - The raw query is read directly instead of parsing every parameter; anything
//!   after `url=` (including `&k=v` pairs) belongs to the encoded target
//! - The inbound body is forwarded as a stream, never buffered
//! - Header policy lives in `security::headers`

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Method};
use url::Url;

use crate::http::error::RelayError;
use crate::security::headers::filter_headers;

/// Literal prefix the raw query string must start with.
pub const TARGET_PREFIX: &str = "url=";

/// Request ready to be sent to the origin.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` when the inbound request carried no body.
    pub body: Option<reqwest::Body>,
}

/// Pull the decoded target out of a raw query string such as
/// `url=http%3A%2F%2Fexample.com%2Fping`.
pub fn extract_target_url(raw_query: &str) -> Result<String, RelayError> {
    let encoded = raw_query
        .strip_prefix(TARGET_PREFIX)
        .filter(|rest| !rest.is_empty())
        .ok_or(RelayError::MissingParameter)?;

    query_unescape(encoded)
}

/// Decode `%XX` escapes and `+` as space. A `%` not followed by two hex digits is
/// rejected, as is a result that is not UTF-8.
fn query_unescape(encoded: &str) -> Result<String, RelayError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3).ok_or(RelayError::InvalidEncoding)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return Err(RelayError::InvalidEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = encoded.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RelayError::InvalidEncoding)
}

/// Parse the target and bind it to the inbound method and body.
///
/// Headers are left empty; see [`OutboundRequest::with_headers_from`].
pub fn build_outbound_request(
    method: Method,
    target: &str,
    body: Body,
) -> Result<OutboundRequest, RelayError> {
    if target.chars().any(|c| c.is_ascii_control()) {
        return Err(invalid("target contains control characters"));
    }
    if target.trim() != target {
        return Err(invalid("target has leading or trailing whitespace"));
    }

    let url = Url::parse(target).map_err(|e| RelayError::InvalidTarget(e.to_string()))?;
    ensure_verbatim(target, &url)?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RelayError::InvalidTarget(format!(
                "scheme '{other}' is not supported"
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("target has no host"));
    }

    let body = if body.is_end_stream() {
        None
    } else {
        Some(reqwest::Body::wrap_stream(body.into_data_stream()))
    };

    Ok(OutboundRequest {
        method,
        url,
        headers: HeaderMap::new(),
        body,
    })
}

fn invalid(reason: &str) -> RelayError {
    RelayError::InvalidTarget(reason.to_string())
}

/// Reject targets that `Url::parse` only accepts by rewriting them, so the origin
/// is asked for the path the caller wrote.
///
/// The target must be `scheme://authority` with a non-empty authority, and the part
/// before `?` or `#` may hold neither a backslash nor a `.`/`..` segment (escaped
/// forms included).
fn ensure_verbatim(target: &str, url: &Url) -> Result<(), RelayError> {
    let (scheme, rest) = target
        .split_once("://")
        .ok_or_else(|| invalid("target is not of the form scheme://host"))?;
    if !scheme.eq_ignore_ascii_case(url.scheme()) {
        return Err(invalid("target is not of the form scheme://host"));
    }

    let before_query = rest.split(['?', '#']).next().unwrap_or(rest);
    if before_query.contains('\\') {
        return Err(invalid("target contains a backslash"));
    }

    let (authority, path) = before_query
        .find('/')
        .map_or((before_query, ""), |i| before_query.split_at(i));
    if authority.is_empty() {
        return Err(invalid("target has no host"));
    }
    if path.split('/').any(is_dot_segment) {
        return Err(invalid("target path has dot segments"));
    }
    Ok(())
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
    )
}

impl OutboundRequest {
    /// Copy the inbound headers through the deny-list and pin `Host` to the target.
    pub fn with_headers_from(mut self, inbound: &HeaderMap) -> Self {
        self.headers = filter_headers(inbound, &self.url);
        self
    }
}
