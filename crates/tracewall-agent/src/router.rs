//! Axum router wiring.
//!
//! Business routes go through the interception middleware; ops routes do not.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::controller::Controller;
use crate::{http, ops};

/// Wrap an application router with call interception.
pub fn intercepted(app: Router, controller: Arc<Controller>) -> Router {
    app.layer(middleware::from_fn_with_state(controller, http::intercept))
}

pub fn build_router(controller: Arc<Controller>) -> Router {
    let app = Router::new().route("/v1/echo", post(echo).get(echo));

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(Arc::clone(&controller))
        .merge(intercepted(app, controller))
}

async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], body)
}
