//! Request handling for the mock server.
//!
//! Ordinary requests are recorded and answered from the live expectation set.
//! Requests on the reserved namespace (`/_request/...`, `/_expectations`,
//! `/_health`) are served directly and never recorded.

use super::log::LogQuery;
use super::response::{error_response, from_template, json_response, out_of_range, text_response};
use super::router::Route;
use super::state::ServerState;
use crate::error::Error;
use crate::expectation::ExpectationSet;
use crate::request::{parse_query_pairs, BasicAuth, Headers, RecordedRequest};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle a request to the mock server
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let route = Route::classify(req.method(), req.uri().path());
    debug!("{} {} -> {:?}", req.method(), req.uri(), route);

    let response = match route {
        Route::Ordinary => handle_ordinary(req, &state, client_addr).await,
        Route::Health => text_response(StatusCode::OK, "ok"),
        Route::Count => text_response(StatusCode::OK, state.request_count().to_string()),
        Route::Log(query) => handle_log_query(&state, query),
        Route::Expectations => handle_expectations(req, &state).await,
        Route::Unsupported => error_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(response)
}

async fn handle_ordinary(
    req: Request<Incoming>,
    state: &ServerState,
    client_addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let recorded = match record(req, client_addr).await {
        Ok(recorded) => recorded,
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    let answer = state.answer(recorded);
    if let Some(delay) = answer.response.delay() {
        tokio::time::sleep(delay).await;
    }
    from_template(&answer.response)
}

/// Snapshot an inbound request for the log.
async fn record(
    req: Request<Incoming>,
    client_addr: SocketAddr,
) -> Result<RecordedRequest, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let headers: Headers = parts
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    let auth = headers.get("authorization").and_then(BasicAuth::from_header);
    let raw_query = parts.uri.query().map(str::to_string);
    let query = raw_query.as_deref().map(parse_query_pairs).unwrap_or_default();

    Ok(RecordedRequest {
        sequence: 0,
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        raw_query,
        query,
        headers,
        body: body.to_vec(),
        remote_host: client_addr.ip().to_string(),
        remote_port: client_addr.port(),
        auth,
        timestamp: chrono::Utc::now(),
    })
}

fn handle_log_query(state: &ServerState, query: LogQuery) -> Response<Full<Bytes>> {
    match state.query(query).and_then(|recorded| recorded.to_wire()) {
        Ok(wire) => text_response(StatusCode::OK, wire),
        Err(e @ Error::OutOfRange { len, .. }) => out_of_range(&e.to_string(), len),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn handle_expectations(req: Request<Incoming>, state: &ServerState) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    match method {
        Method::GET => json_response(StatusCode::OK, &state.expectations()),
        Method::DELETE => {
            state.clean();
            info!("Expectations and request log cleared");
            text_response(StatusCode::OK, "cleaned")
        }
        Method::PUT | Method::POST => {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        &format!("Failed to read request body: {e}"),
                    )
                }
            };
            let set: ExpectationSet = match serde_json::from_slice(&body) {
                Ok(set) => set,
                Err(e) => {
                    warn!("Rejected malformed expectation set: {}", e);
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        &format!("Invalid expectation set: {e}"),
                    );
                }
            };
            let count = set.len();
            match state.set_up(set) {
                Ok(()) => {
                    info!("Installed {} expectation(s)", count);
                    text_response(StatusCode::OK, count.to_string())
                }
                Err(e) => {
                    warn!("Rejected expectation set: {}", e);
                    error_response(StatusCode::BAD_REQUEST, &e.to_string())
                }
            }
        }
        _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    }
}
