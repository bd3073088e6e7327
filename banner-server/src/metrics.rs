//! Prometheus-text `/metrics` endpoint, fed by a request counter and a latency
//! histogram recorded alongside the logging middleware.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Installs the global Prometheus recorder. Call once, before any request is served.
pub fn install() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Records a request counter and latency histogram labeled by method and route.
pub async fn record(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status)
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Handler for `GET /metrics`: renders the current snapshot as Prometheus text.
pub async fn handler(handle: axum::extract::State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
