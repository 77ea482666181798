//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::controller::Controller;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(controller): State<Arc<Controller>>) -> Response {
    let mut body = controller.metrics().render();
    let bridge = controller.reencoder().bridge();
    body.push_str(&format!(
        "# TYPE tracewall_schema_cached_files gauge\ntracewall_schema_cached_files {}\n\
         # TYPE tracewall_schema_builds_total counter\ntracewall_schema_builds_total {}\n",
        bridge.cached_files(),
        bridge.builds()
    ));

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], body).into_response()
}
