//! HTTP server setup and the relay handler.
//!
//! # Responsibilities
//! - Create the Axum Router (health endpoint + relay fallback)
//! - Serve each accepted connection with hyper's HTTP/1 builder, bounded by the
//!   header read timeout and the header size cap
//! - Run the relay pipeline for every request: translate, build a fresh transport,
//!   relay, stream back
//! - Drain connections on shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ProxyConfig, TransportConfig};
use crate::http::error::RelayError;
use crate::http::health::{health_handler, HEALTH_PATH};
use crate::http::request::{build_outbound_request, extract_target_url};
use crate::http::response::stream_response;
use crate::http::transport::Transport;
use crate::net::{ConnectionTracker, Listener};
use crate::observability::metrics;

/// Back-off after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Application state injected into handlers. Read-only for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<TransportConfig>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let router = Self::build_router(&config);
        Self {
            router,
            config: Arc::new(config),
        }
    }

    /// Build the Axum router with its middleware layers.
    pub fn build_router(config: &ProxyConfig) -> Router {
        let state = AppState {
            transport: Arc::new(config.transport.clone()),
        };

        Router::new()
            .route(HEALTH_PATH, any(health_handler))
            .fallback(relay_handler)
            .with_state(state)
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %Uuid::new_v4(),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let limits = &self.config.listener;
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(limits.header_read_timeout())
            .max_buf_size(limits.max_header_bytes)
            .keep_alive(true);

        let tracker = ConnectionTracker::new();

        loop {
            let (stream, peer, permit) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            let guard = tracker.track();
            let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);
            let service = TowerToHyperService::new(self.router.clone());
            let builder = builder.clone();
            let mut connection_shutdown = shutdown.resubscribe();

            tokio::spawn(
                async move {
                    let _permit = permit;
                    let _guard = guard;

                    let conn = builder.serve_connection(TokioIo::new(stream), service);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        result = conn.as_mut() => result,
                        _ = connection_shutdown.recv() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "Connection ended with error");
                    }
                }
                .instrument(span),
            );
        }

        drop(listener);
        tracing::info!(active = tracker.active_count(), "Draining connections");
        if !tracker.drain(limits.drain_timeout()).await {
            tracing::warn!(
                remaining = tracker.active_count(),
                "Drain deadline passed, abandoning open connections"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler: every path except `/health`.
///
/// Successful relays are logged and recorded by the response body once it ends;
/// failures before the response head are handled here.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    match relay(&state, request, start).await {
        Ok(response) => response,
        Err(err) => {
            let status = err.status().as_u16();
            match &err {
                RelayError::Upstream(_) | RelayError::InvalidTarget(_) => {
                    tracing::warn!(error = %err, status, "Relay failed");
                }
                RelayError::MissingParameter | RelayError::InvalidEncoding => {
                    tracing::debug!(error = %err, status, "Relay rejected");
                }
            }
            metrics::record_relay(method.as_str(), status, start);
            err.into_response()
        }
    }
}

async fn relay(state: &AppState, request: Request<Body>, start: Instant) -> Result<Response, RelayError> {
    let (parts, body) = request.into_parts();

    let target = extract_target_url(parts.uri.query().unwrap_or_default())?;
    let outbound = build_outbound_request(parts.method.clone(), &target, body)?
        .with_headers_from(&parts.headers);

    let transport = Transport::new(&state.transport)
        .map_err(|e| RelayError::InvalidTarget(format!("client construction failed: {e}")))?;
    let upstream = transport.relay(outbound).await?;
    tracing::debug!(status = upstream.status().as_u16(), elapsed = ?start.elapsed(), "Response head received");

    Ok(stream_response(upstream, parts.method, start))
}
