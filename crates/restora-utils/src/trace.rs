//! Per-request tracing shared by both HTTP services.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Wrap each request in an `http_request` span. The trace id comes from the
/// caller's `x-trace-id` when it is a UUID, otherwise a new one is minted.
/// The id is echoed on the response.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let started = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        if let Some(h) = &header {
            req.headers_mut().insert(X_TRACE_ID, h.clone());
        }

        let mut response = next.run(req).await;
        if let Some(h) = header {
            response.headers_mut().insert(X_TRACE_ID, h);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}
