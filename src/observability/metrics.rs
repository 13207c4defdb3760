//! Metrics collection and exposition.
//!
//! # Metrics
//! - `treeline_requests_total` (counter): requests by method, status, kind
//! - `treeline_request_duration_seconds` (histogram): time to response head
//! - `treeline_render_errors_total` (counter): render failures by stage
//! - `treeline_route_builds_total` (counter): route tree builds by result
//! - `treeline_route_nodes` (gauge): nodes in the current route tree
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter, so
//!   library code and tests never need a recorder
//! - Labels are low-cardinality: no paths, only request kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const REQUEST_DURATION: &str = "treeline_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

/// Which flow served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Document,
    Navigation,
    Manifest,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Document => "document",
            RequestKind::Navigation => "navigation",
            RequestKind::Manifest => "manifest",
        }
    }
}

pub fn record_request(method: &str, status: u16, kind: RequestKind, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "treeline_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "kind" => kind.as_str()
    )
    .increment(1);
    histogram!(
        REQUEST_DURATION,
        "method" => method,
        "status" => status,
        "kind" => kind.as_str()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Where a render failed: `load`, `shell` or `deferred`.
pub fn record_render_error(stage: &'static str) {
    counter!("treeline_render_errors_total", "stage" => stage).increment(1);
}

pub fn record_route_build(nodes: usize, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("treeline_route_builds_total", "result" => result).increment(1);
    if success {
        gauge!("treeline_route_nodes").set(nodes as f64);
    }
}
