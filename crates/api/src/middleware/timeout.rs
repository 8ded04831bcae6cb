//! Per-request deadline envelope.
//!
//! [`run_with_deadline`] runs a handler as its own task and races it against a
//! timer. The handler and the timeout path share a [`GuardedWriter`], so the
//! client receives exactly one response: the handler's if it started writing
//! before the deadline, otherwise a 504.
//!
//! The handler task is never aborted. It is handed a [`RequestDeadline`] and
//! is expected to notice cancellation and stop on its own; anything it writes
//! after the envelope has sealed the writer is discarded.
//!
//! [`timeout_envelope`] adapts this to axum middleware.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::middleware::guarded_writer::GuardedWriter;

/// Body written when the deadline fires before the handler responds.
pub const TIMEOUT_BODY: &str = r#"{"error": "request timeout"}"#;

/// Cancellation signal and deadline for one request.
///
/// Inserted into request extensions by [`timeout_envelope`] and available to
/// handlers as an extractor. Outside the envelope it is never cancelled.
#[derive(Debug, Clone)]
pub struct RequestDeadline {
    token: CancellationToken,
    expires_at: Option<Instant>,
}

impl RequestDeadline {
    /// A deadline that never fires.
    pub fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
            expires_at: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the request is abandoned (timeout or client gone).
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestDeadline {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestDeadline>()
            .cloned()
            .unwrap_or_else(RequestDeadline::unbounded))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    /// The handler finished before the deadline.
    Completed,
    /// The deadline fired first. `handler_responded` is true when the handler
    /// had already started its response, so no 504 was written.
    TimedOut { handler_responded: bool },
}

/// What [`run_with_deadline`] hands back once the race is decided.
pub struct Enveloped {
    pub outcome: EnvelopeOutcome,
    pub response: Response,
    /// The sealed writer; only useful for inspecting counters.
    pub writer: GuardedWriter,
}

fn timeout_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Run `handler` with a deadline of `timeout`.
///
/// The handler gets a [`RequestDeadline`] and a clone of the response writer.
/// If it panics before the deadline, the panic is resumed on the caller.
/// Dropping the returned future (e.g. the client disconnected) cancels the
/// deadline.
pub async fn run_with_deadline<F, Fut>(timeout: Duration, handler: F) -> Enveloped
where
    F: FnOnce(RequestDeadline, GuardedWriter) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let _cancel_on_exit = token.clone().drop_guard();

    let deadline = RequestDeadline {
        token: token.clone(),
        expires_at: Some(Instant::now() + timeout),
    };
    let writer = GuardedWriter::new();
    let mut task = tokio::spawn(handler(deadline, writer.clone()));

    let outcome = tokio::select! {
        biased;

        joined = &mut task => match joined {
            Ok(()) => EnvelopeOutcome::Completed,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                tracing::error!(error = %err, "Handler task ended without completing");
                EnvelopeOutcome::Completed
            }
        },

        () = tokio::time::sleep(timeout) => {
            token.cancel();
            let wrote_timeout = writer.write_if_open(
                StatusCode::GATEWAY_TIMEOUT,
                timeout_headers(),
                Bytes::from_static(TIMEOUT_BODY.as_bytes()),
            );
            EnvelopeOutcome::TimedOut { handler_responded: !wrote_timeout }
        }
    };

    let response = writer.seal();
    Enveloped {
        outcome,
        response,
        writer,
    }
}

/// Handler timeout, configured once at startup.
#[derive(Debug, Clone, Copy)]
pub struct HandlerTimeout(pub Duration);

/// axum middleware running the rest of the stack inside [`run_with_deadline`].
///
/// The inner response body is buffered before it is committed, so streaming
/// responses are not supported behind this layer.
pub async fn timeout_envelope(
    State(HandlerTimeout(timeout)): State<HandlerTimeout>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let enveloped = run_with_deadline(timeout, move |deadline, writer| async move {
        let mut request = request;
        request.extensions_mut().insert(deadline);

        let (parts, body) = next.run(request).await.into_parts();
        // Buffer first so header and body are committed back to back.
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to buffer response body");
                Bytes::new()
            }
        };

        if let Err(e) = writer.write_header(parts.status, parts.headers) {
            tracing::debug!(error = %e, "Discarding late response");
            return;
        }
        if let Err(e) = writer.write_body(bytes) {
            tracing::debug!(error = %e, "Discarding late response body");
        }
    })
    .await;

    if let EnvelopeOutcome::TimedOut { handler_responded } = enveloped.outcome {
        tracing::warn!(
            %method,
            %path,
            timeout_ms = timeout.as_millis() as u64,
            handler_responded,
            "Request timed out"
        );
    }

    enveloped.response
}
