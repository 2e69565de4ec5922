//! Outbound transport, built fresh for every relayed request.
//!
//! # Responsibilities
//! - Build a client that never keeps or reuses a connection
//! - Send the outbound request and wait for the response head
//!
//! # Design Decisions
//! - One `reqwest::Client` per request, dropped with the response. Connections are
//!   never shared between callers multiplexed through the same process
//! - Certificate validation is off; operators point the proxy at hosts they know
//! - HTTP/1.1 only with `Connection: close`, so every relay is a new TCP/TLS
//!   handshake
//! - Redirects are returned to the caller, never followed
//! - No content decoding: the client is built without compression features

use std::time::Duration;

use axum::http::header::CONNECTION;
use axum::http::HeaderValue;
use reqwest::redirect::Policy;
use tokio::time;

use crate::config::TransportConfig;
use crate::http::error::UpstreamFailure;
use crate::http::request::OutboundRequest;

/// Idle connections are released almost immediately. With no idle slots per host
/// nothing is ever parked in the pool in the first place.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// A single-use client plus the response-head deadline.
#[derive(Debug)]
pub struct Transport {
    client: reqwest::Client,
    response_header_timeout: Duration,
}

impl Transport {
    /// Build a new transport. Called once per relayed request.
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .http1_only()
            .no_proxy()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            response_header_timeout: config.response_header_timeout(),
        })
    }

    /// Send the request and return once the origin's status and headers arrive.
    ///
    /// The body is still streaming when this returns; the overall request timeout
    /// keeps bounding it.
    pub async fn relay(&self, outbound: OutboundRequest) -> Result<reqwest::Response, UpstreamFailure> {
        let OutboundRequest {
            method,
            url,
            mut headers,
            body,
        } = outbound;
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder.build()?;

        match time::timeout(self.response_header_timeout, self.client.execute(request)).await {
            Ok(response) => Ok(response?),
            Err(_) => Err(UpstreamFailure::HeaderTimeout(self.response_header_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Method;
    use tokio::net::TcpListener;

    use super::*;
    use crate::http::request::build_outbound_request;

    #[test]
    fn builds_from_default_config() {
        let transport = Transport::new(&TransportConfig::default()).unwrap();
        assert_eq!(transport.response_header_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn silent_origin_hits_header_timeout() {
        // Accepts the connection but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = TransportConfig {
            response_header_secs: 1,
            ..TransportConfig::default()
        };
        let transport = Transport::new(&config).unwrap();
        let outbound =
            build_outbound_request(Method::GET, &format!("http://{addr}/slow"), Body::empty()).unwrap();

        let err = transport.relay(outbound).await.unwrap_err();
        assert!(matches!(err, UpstreamFailure::HeaderTimeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let outbound =
            build_outbound_request(Method::GET, &format!("http://{addr}/"), Body::empty()).unwrap();

        assert!(matches!(
            transport.relay(outbound).await,
            Err(UpstreamFailure::Transport(_))
        ));
    }
}
