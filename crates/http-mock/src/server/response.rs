//! Response helpers for the mock server.

use crate::expectation::ResponseTemplate;
use crate::request::RECORDING_CONTENT_TYPE;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Header set on 404s caused by a read past either end of the request log.
pub const ERROR_HEADER: &str = "x-http-mock-error";
pub const OUT_OF_RANGE: &str = "out-of-range";
/// Number of entries in the log when an out-of-range read was refused.
pub const LOG_LENGTH_HEADER: &str = "x-http-mock-log-length";

/// Build an HTTP response with headers.
///
/// Falls back to a bare 500 if the builder rejects a header.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    build_response_with_headers(status, [("Content-Type", RECORDING_CONTENT_TYPE)], body)
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { error: message })
}

pub fn out_of_range(message: &str, len: usize) -> Response<Full<Bytes>> {
    let len = len.to_string();
    build_response_with_headers(
        StatusCode::NOT_FOUND,
        [
            ("Content-Type", RECORDING_CONTENT_TYPE),
            (ERROR_HEADER, OUT_OF_RANGE),
            (LOG_LENGTH_HEADER, len.as_str()),
        ],
        message.to_string(),
    )
}

/// Render an expectation's response template.
pub fn from_template(template: &ResponseTemplate) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(template.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    build_response_with_headers(
        status,
        template.headers.iter().map(|(k, v)| (k, v)),
        template.body.clone(),
    )
}
