//! Content negotiation: picks the wire [`Format`] from a request's `Accept` header and
//! builds response bodies in it — `application/json` by default, `application/yaml`
//! when requested.
use axum::body::Bytes;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use orc_core::codec::Format;
use serde::Serialize;

pub fn negotiate(headers: &HeaderMap) -> Format {
    Format::from_accept(headers.get(ACCEPT).and_then(|v| v.to_str().ok()))
}

/// Encodes `value` in `format` and wraps it in a response carrying the matching
/// `Content-Type`, or falls back to a 500 `Status` body if encoding itself fails (which
/// only `Serialize`/`serde_yaml` bugs, not user input, could trigger).
pub fn encoded_response<T: Serialize>(status: StatusCode, format: Format, value: &T) -> Response {
    match format.encode(value) {
        Ok(body) => ([(CONTENT_TYPE, format.content_type())], status, Bytes::from(body)).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
