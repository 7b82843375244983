use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::{debug, error, trace, warn};
use std::time::Instant;

/// Access log. Bodies are never logged.
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_body_size = req
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let start = Instant::now();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    if path == "/health" {
        trace!(
            target: "http",
            "health check method={} status={} duration_ms={}",
            method,
            status.as_u16(),
            duration.as_millis()
        );
    } else if status.is_server_error() {
        error!(
            target: "http",
            "request failed method={} path={} status={} duration_ms={} request_body_size={}",
            method,
            path,
            status.as_u16(),
            duration.as_millis(),
            request_body_size
        );
    } else if status.is_client_error() {
        warn!(
            target: "http",
            "request rejected method={} path={} status={} duration_ms={} request_body_size={}",
            method,
            path,
            status.as_u16(),
            duration.as_millis(),
            request_body_size
        );
    } else {
        debug!(
            target: "http",
            "request method={} path={} status={} duration_ms={}",
            method,
            path,
            status.as_u16(),
            duration.as_millis()
        );
    }

    response
}
