//! Maps `orc_core::Error` to HTTP, once: every handler converts its registry result
//! through this single function rather than matching on error kinds itself.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orc_core::codec::Format;
use orc_core::Error;

pub struct ApiError {
    error: Error,
    format: Format,
}

impl ApiError {
    pub fn new(error: Error, format: Format) -> Self {
        Self { error, format }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        crate::format::encoded_response(status, self.format, &self.error.to_status())
    }
}
