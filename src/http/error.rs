//! Relay failures and their mapping to caller-facing responses.
//!
//! Every failure in the relay path is one of four kinds. Each kind maps to a fixed
//! status code and a fixed plain-text body; the underlying cause is only logged.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Why the origin could not be reached or read. All causes look the same to the
/// caller.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("no response head within {0:?}")]
    HeaderTimeout(Duration),
}

#[derive(Debug, Error)]
pub enum RelayError {
    /// The query string does not start with `url=` followed by a value.
    #[error("query string does not start with 'url='")]
    MissingParameter,

    /// The value after `url=` is not valid percent-encoding.
    #[error("target url is not valid percent-encoding")]
    InvalidEncoding,

    /// The decoded target cannot become an outbound request.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] UpstreamFailure),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingParameter | RelayError::InvalidEncoding => StatusCode::BAD_REQUEST,
            RelayError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Body sent to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            RelayError::MissingParameter => "Missing 'url' parameter",
            RelayError::InvalidEncoding => "Invalid URL encoding",
            RelayError::InvalidTarget(_) => "Invalid request",
            RelayError::Upstream(_) => "Request failed",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}
