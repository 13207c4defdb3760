//! Request handling.
//!
//! # Responsibilities
//! - Request IDs: reuse a well-formed incoming one, else UUID v4 (tower-http
//!   `SetRequestIdLayer`), echoed on the response (`PropagateRequestIdLayer`)
//! - Detect navigation (payload) requests
//! - Turn the route params and query string into page props
//!
//! # Design Decisions
//! - Request ID added as early as possible, so every span carries it
//! - Incoming IDs are only trusted when short and printable

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request};
use serde_json::{json, Map, Value};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

use crate::client::NAVIGATION_HEADER;
use crate::routing::Params;

pub const X_REQUEST_ID: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Assigns an id to requests that arrive without a usable one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(request_id_header(), MakeRequestUuid)
}

/// Copies the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(request_id_header())
}

fn is_well_formed(headers: &HeaderMap) -> bool {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|text| {
            !text.is_empty()
                && text.len() <= MAX_REQUEST_ID_LEN
                && text.bytes().all(|b| b.is_ascii_graphic())
        })
}

/// Drop an incoming id that is empty, oversized or not printable, so
/// `SetRequestIdLayer` generates a fresh one.
pub async fn drop_malformed_request_id(mut request: Request<Body>) -> Request<Body> {
    if request.headers().contains_key(X_REQUEST_ID) && !is_well_formed(request.headers()) {
        request.headers_mut().remove(X_REQUEST_ID);
    }
    request
}

/// The id assigned to `request`, if the request-id layers ran.
pub fn request_id<B>(request: &Request<B>) -> Option<&str> {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
}

/// True for client-router payload requests.
pub fn is_navigation(headers: &HeaderMap) -> bool {
    headers
        .get(NAVIGATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "1")
}

/// Query string as a JSON object. Repeated keys become arrays.
pub fn search_params(query: Option<&str>) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

/// Props handed to components and shipped in the hydration payload.
pub fn page_props(params: &Params, query: Option<&str>) -> Value {
    json!({
        "params": params,
        "searchParams": search_params(query),
    })
}
