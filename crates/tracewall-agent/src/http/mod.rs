//! Axum host adapter.
//!
//! `intercept` wraps any router via `axum::middleware::from_fn_with_state`.
//! The request body is read up to `capture.max_request_bytes`, captured and
//! re-attached for the handler. Blocked calls never reach the handler and get
//! the configured status with the reason as body. The response body is passed
//! through as a stream and copied into the capture buffer as frames go by.
//!
//! The call is owned by a [`CallGuard`] from the first line on. Whoever drops
//! it last (the middleware future, or the response stream) finalizes the call.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::BytesMut;
use futures_util::{Stream, StreamExt};
use tracing::{field, Instrument, Span};

use tracewall_core::RouteMeta;

use crate::controller::{Controller, Direction, Guarded, InterceptedCall};

pub async fn intercept(State(controller): State<Arc<Controller>>, req: Request, next: Next) -> Response {
    let route = RouteMeta::new(req.method().as_str(), req.uri().path());
    let span = tracing::info_span!(
        "intercept",
        method = %route.method,
        path = %route.path,
        call_id = field::Empty,
        outcome = field::Empty,
    );
    run(controller, route, req, next).instrument(span).await
}

async fn run(controller: Arc<Controller>, route: RouteMeta, req: Request, next: Next) -> Response {
    let call = controller.start_call(route);
    let span = Span::current();
    span.record("call_id", call.id());
    let mut guard = CallGuard { controller, call, span };

    capture_headers(&mut guard.call, Direction::Request, req.headers());
    let (parts, body) = req.into_parts();
    let limit = guard.controller.capture().max_request_bytes;
    let bytes = match read_limited(&parts.headers, body, limit).await {
        Ok(b) => b,
        Err(BodyError::TooLarge) => {
            tracing::warn!(limit, "request body over limit");
            return guard.reject(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
        Err(BodyError::Read(e)) => {
            tracing::warn!(error = %e, "failed to read request body");
            return guard.reject(StatusCode::BAD_REQUEST, "unreadable request body");
        }
    };
    guard.call.append_body(Direction::Request, &bytes);
    let req = Request::from_parts(parts, Body::from(bytes));

    let response = match guard.controller.guard(&mut guard.call, || next.run(req)).await {
        Guarded::Ran(resp) => resp,
        Guarded::Skipped { reason } => {
            let status = StatusCode::from_u16(guard.controller.status_code()).unwrap_or(StatusCode::FORBIDDEN);
            (status, reason).into_response()
        }
    };

    capture_headers(&mut guard.call, Direction::Response, response.headers());
    if !guard.controller.capture().response_body {
        return response;
    }
    let (parts, body) = response.into_parts();
    let stream = CapturingStream {
        inner: Box::pin(body.into_data_stream()),
        guard: Some(guard),
    };
    Response::from_parts(parts, Body::from_stream(stream))
}

fn capture_headers(call: &mut InterceptedCall, direction: Direction, headers: &HeaderMap) {
    for (name, value) in headers {
        call.add_header(direction, name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
    }
}

enum BodyError {
    TooLarge,
    Read(axum::Error),
}

/// Read a body, giving up as soon as it is known to exceed `limit`.
async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, BodyError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|n| n > limit as u64) {
        return Err(BodyError::TooLarge);
    }

    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Read)?;
        if buf.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Owns an in-flight call. Dropping it finalizes the call exactly once.
struct CallGuard {
    controller: Arc<Controller>,
    call: InterceptedCall,
    span: Span,
}

impl CallGuard {
    /// Answer from the middleware itself; the handler never runs.
    fn reject(mut self, status: StatusCode, message: &'static str) -> Response {
        let response = (status, message).into_response();
        capture_headers(&mut self.call, Direction::Response, response.headers());
        if self.controller.capture().response_body {
            self.call.append_body(Direction::Response, message.as_bytes());
        }
        response
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if let Some(record) = self.controller.finalize(&mut self.call) {
            self.span.record("outcome", record.outcome);
        }
    }
}

type DataStream = Pin<Box<dyn Stream<Item = Result<Bytes, axum::Error>> + Send>>;

/// Response body pass-through. Frames are forwarded untouched; the call is
/// finalized when the body ends, fails or is dropped by the client.
struct CapturingStream {
    inner: DataStream,
    guard: Option<CallGuard>,
}

impl Stream for CapturingStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = this.inner.as_mut().poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(guard) = this.guard.as_mut() {
                    guard.call.append_body(Direction::Response, chunk);
                }
            }
            Poll::Ready(Some(Err(e))) => {
                if let Some(guard) = this.guard.take() {
                    guard.span.in_scope(|| tracing::warn!(error = %e, "response body failed"));
                }
            }
            Poll::Ready(None) => this.guard = None,
            Poll::Pending => {}
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
