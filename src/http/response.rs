//! Origin response streaming.
//!
//! # Responsibilities
//! - Copy the origin's status and every response header verbatim
//! - Stream the body to the caller as chunks arrive
//! - Log and record the relay once the body has been fully passed on
//!
//! # Design Decisions
//! - No buffering: memory use is independent of payload size
//! - No header stripping on the way back; only inbound headers are filtered
//! - A body error mid-stream aborts the caller's response; it is logged here since
//!   the status line has already gone out

use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::Method;
use axum::response::Response;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use url::Url;

use crate::observability::metrics;

/// Turn the origin response into the response for the caller.
///
/// `start` is when the relay began; the elapsed time is reported when the body
/// ends, not when the head arrives.
pub fn stream_response(mut upstream: reqwest::Response, method: Method, start: Instant) -> Response {
    let status = upstream.status();
    let headers = std::mem::take(upstream.headers_mut());
    let completion = RelayCompletion::new(upstream.url().clone(), method, status.as_u16(), start);

    let body = TrackedBody {
        inner: upstream.bytes_stream().boxed(),
        completion,
    };

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    /// The caller stopped reading before the origin body ended.
    Aborted,
}

/// Bookkeeping for one relayed body. Reports exactly once.
struct RelayCompletion {
    target: Url,
    method: Method,
    status: u16,
    start: Instant,
    bytes: u64,
    outcome: Option<Outcome>,
}

impl RelayCompletion {
    fn new(target: Url, method: Method, status: u16, start: Instant) -> Self {
        Self {
            target,
            method,
            status,
            start,
            bytes: 0,
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);

        let elapsed = self.start.elapsed();
        match outcome {
            Outcome::Completed => tracing::info!(
                target_url = %self.target,
                status = self.status,
                bytes = self.bytes,
                elapsed = ?elapsed,
                "Relay completed"
            ),
            // Logged with its cause in `TrackedBody::poll_next`.
            Outcome::Failed => {}
            Outcome::Aborted => tracing::debug!(
                target_url = %self.target,
                status = self.status,
                bytes = self.bytes,
                elapsed = ?elapsed,
                "Caller went away before the body ended"
            ),
        }
        metrics::record_relay(self.method.as_str(), self.status, self.start);
    }
}

impl Drop for RelayCompletion {
    fn drop(&mut self) {
        self.finish(Outcome::Aborted);
    }
}

/// Origin body stream that reports to its `RelayCompletion` when it ends.
struct TrackedBody {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    completion: RelayCompletion,
}

impl Stream for TrackedBody {
    type Item = reqwest::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(this.inner.poll_next_unpin(cx));
        match &item {
            Some(Ok(chunk)) => this.completion.bytes += chunk.len() as u64,
            Some(Err(e)) => {
                tracing::warn!(
                    target_url = %this.completion.target,
                    bytes = this.completion.bytes,
                    error = %e,
                    "Origin body stream failed"
                );
                this.completion.finish(Outcome::Failed);
            }
            None => this.completion.finish(Outcome::Completed),
        }
        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn tracked(chunks: &[&'static str]) -> TrackedBody {
        let items: Vec<reqwest::Result<Bytes>> =
            chunks.iter().map(|&c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        TrackedBody {
            inner: stream::iter(items).boxed(),
            completion: RelayCompletion::new(
                Url::parse("http://example.com/x").unwrap(),
                Method::GET,
                200,
                Instant::now(),
            ),
        }
    }

    #[tokio::test]
    async fn completion_waits_for_end_of_body() {
        let mut body = tracked(&["hello", " ", "world"]);

        body.next().await.unwrap().unwrap();
        body.next().await.unwrap().unwrap();
        assert_eq!(body.completion.outcome, None);
        assert_eq!(body.completion.bytes, 6);

        body.next().await.unwrap().unwrap();
        assert_eq!(body.completion.outcome, None);

        assert!(body.next().await.is_none());
        assert_eq!(body.completion.outcome, Some(Outcome::Completed));
        assert_eq!(body.completion.bytes, 11);
    }

    #[tokio::test]
    async fn empty_body_completes_on_first_poll() {
        let mut body = tracked(&[]);
        assert!(body.next().await.is_none());
        assert_eq!(body.completion.outcome, Some(Outcome::Completed));
    }

    #[test]
    fn outcome_is_reported_once() {
        let mut completion = RelayCompletion::new(
            Url::parse("http://example.com/").unwrap(),
            Method::GET,
            200,
            Instant::now(),
        );
        completion.finish(Outcome::Completed);
        completion.finish(Outcome::Failed);
        assert_eq!(completion.outcome, Some(Outcome::Completed));
    }
}
