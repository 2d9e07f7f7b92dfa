//! Client side of the request log query protocol.
//!
//! Each query is one HTTP call on the reserved `/_request` namespace. The
//! response is accepted only if it has status 200, the `text/plain` content
//! type recordings are served with, and a body that parses as a
//! [`RecordedRequest`]. Anything else becomes a descriptive error naming the
//! queried path.

use super::transport::{RawResponse, Transport};
use crate::error::{Error, ProtocolError, Result};
use crate::request::{RecordedRequest, RECORDING_CONTENT_TYPE};
use crate::server::{
    log_method, log_path, LogQuery, ERROR_HEADER, LOG_LENGTH_HEADER, OUT_OF_RANGE,
};
use reqwest::Method;
use std::sync::Arc;

/// Longest payload excerpt quoted in a deserialization error.
const PAYLOAD_EXCERPT_LEN: usize = 200;

/// Accessor for the request log of one running server.
#[derive(Clone)]
pub struct RequestCollection {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCollection").finish_non_exhaustive()
    }
}

impl RequestCollection {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Most recently recorded request. Same as [`last`](Self::last).
    pub async fn latest(&self) -> Result<RecordedRequest> {
        self.fetch(LogQuery::Last).await
    }

    pub async fn last(&self) -> Result<RecordedRequest> {
        self.fetch(LogQuery::Last).await
    }

    pub async fn first(&self) -> Result<RecordedRequest> {
        self.fetch(LogQuery::First).await
    }

    /// Request at zero-based `index`, counted from the oldest.
    pub async fn at(&self, index: usize) -> Result<RecordedRequest> {
        self.fetch(LogQuery::At(index)).await
    }

    /// Remove and return the oldest request.
    pub async fn shift(&self) -> Result<RecordedRequest> {
        self.fetch(LogQuery::Shift).await
    }

    /// Remove and return the newest request.
    pub async fn pop(&self) -> Result<RecordedRequest> {
        self.fetch(LogQuery::Pop).await
    }

    /// Number of requests currently in the log.
    pub async fn count(&self) -> Result<usize> {
        let path = format!("{}/count", crate::server::REQUEST_PREFIX);
        let response = self.transport.call(Method::GET, &path).await?;
        validate(&path, &response)?;
        let text = String::from_utf8_lossy(&response.body);
        text.trim()
            .parse()
            .map_err(|_| deserialization_error(&path, &response))
    }

    async fn fetch(&self, query: LogQuery) -> Result<RecordedRequest> {
        let path = log_path(query);
        let response = self.transport.call(log_method(query), &path).await?;

        if response.status == 404 && response.headers.get(ERROR_HEADER) == Some(OUT_OF_RANGE) {
            let len = response
                .headers
                .get(LOG_LENGTH_HEADER)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(Error::OutOfRange {
                query: query.to_string(),
                len,
            });
        }
        validate(&path, &response)?;

        RecordedRequest::from_wire(&response.body)
            .map_err(|_| deserialization_error(&path, &response))
    }
}

fn validate(path: &str, response: &RawResponse) -> Result<()> {
    if response.status != 200 {
        return Err(ProtocolError::UnexpectedStatus {
            path: path.to_string(),
            expected: 200,
            actual: response.status,
        }
        .into());
    }

    let actual = response.content_type().unwrap_or_default();
    if media_type(actual) != RECORDING_CONTENT_TYPE {
        return Err(ProtocolError::UnexpectedContentType {
            path: path.to_string(),
            expected: RECORDING_CONTENT_TYPE.to_string(),
            actual: actual.to_string(),
        }
        .into());
    }
    Ok(())
}

/// `text/plain; charset=UTF-8` -> `text/plain`
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn deserialization_error(path: &str, response: &RawResponse) -> Error {
    let payload = String::from_utf8_lossy(&response.body);
    Error::Deserialization {
        path: path.to_string(),
        payload: payload.chars().take(PAYLOAD_EXCERPT_LEN).collect(),
    }
}
