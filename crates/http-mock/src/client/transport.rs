//! HTTP transport used by the client side.

use crate::error::Result;
use crate::request::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use std::time::Duration;

/// Status, headers and body of a response, fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

/// One request/response exchange with a mock server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: Method, path: &str) -> Result<RawResponse>;
}

/// HTTP client bound to one server's base URL.
#[derive(Debug, Clone)]
pub struct MockClient {
    base_url: String,
    http: reqwest::Client,
}

impl MockClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::from_parts(base_url, http))
    }

    pub fn from_parts(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.url(path))
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(Method::DELETE, path)
    }
}

#[async_trait]
impl Transport for MockClient {
    async fn call(&self, method: Method, path: &str) -> Result<RawResponse> {
        let response = self.request(method, path).send().await?;
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.bytes().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
