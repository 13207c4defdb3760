//! Per-request spans.
//!
//! Every event logged while serving a request (matching, rendering, streaming)
//! carries the request id, method and path of the span created here.

use axum::http::Request;
use tower_http::trace::MakeSpan;

use crate::http::request::{is_navigation, request_id};

/// `MakeSpan` for the `TraceLayer`, keyed by the id `SetRequestIdLayer` assigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> ::tracing::Span {
        let id = request_id(request).unwrap_or("unknown");
        ::tracing::info_span!(
            "request",
            request_id = %id,
            method = %request.method(),
            path = %request.uri().path(),
            navigation = is_navigation(request.headers()),
        )
    }
}
