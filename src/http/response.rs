//! Response builders.
//!
//! # Design Decisions
//! - Documents stream; nothing here buffers a render
//! - Error bodies never carry details unless the caller passes them in
//!   (development posture)

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{Stream, StreamExt};
use serde_json::json;

use crate::hydration::HydrationPayload;

const HTML: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");
const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

/// Streamed HTML document.
pub fn html_stream<S>(status: StatusCode, chunks: S) -> Response
where
    S: Stream<Item = Bytes> + Send + 'static,
{
    let body = Body::from_stream(chunks.map(Ok::<_, Infallible>));
    (
        status,
        [(header::CONTENT_TYPE, HTML), (header::CACHE_CONTROL, NO_STORE)],
        body,
    )
        .into_response()
}

/// Complete HTML document.
pub fn html(status: StatusCode, markup: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HTML), (header::CACHE_CONTROL, NO_STORE)],
        markup,
    )
        .into_response()
}

/// Navigation payload as JSON.
pub fn payload(status: StatusCode, payload: HydrationPayload) -> Response {
    (status, [(header::CACHE_CONTROL, NO_STORE)], Json(payload)).into_response()
}

/// `{ "error": message }`.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
