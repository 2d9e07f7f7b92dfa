//! Extractors pull one comparable value out of a recorded request.

use crate::request::RecordedRequest;
use serde::{Deserialize, Serialize};
use serde_json_path::JsonPath;

/// Named function from a request to an optional string value.
///
/// `None` means the value is absent (missing header, path outside the base
/// path, body that is not JSON, ...). Only the `exists` comparison can match
/// an absent value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Extractor {
    Method,
    #[serde(rename_all = "camelCase")]
    Path {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_path: Option<String>,
    },
    Header {
        name: String,
    },
    Query {
        name: String,
    },
    Body,
    /// RFC 9535 JSONPath evaluated against the body; the first node wins.
    ///
    /// Strings are extracted unquoted and other nodes as compact JSON, so a
    /// JSON `null` and the string `"null"` both extract as `null`. Match on
    /// `body` or inspect `request.body` in a script to tell them apart.
    JsonField {
        path: String,
    },
}

impl Extractor {
    pub fn compile(&self) -> Result<CompiledExtractor, String> {
        Ok(match self {
            Extractor::Method => CompiledExtractor::Method,
            Extractor::Path { base_path } => {
                CompiledExtractor::Path(base_path.as_deref().and_then(normalize_base_path))
            }
            Extractor::Header { name } => CompiledExtractor::Header(name.clone()),
            Extractor::Query { name } => CompiledExtractor::Query(name.clone()),
            Extractor::Body => CompiledExtractor::Body,
            Extractor::JsonField { path } => CompiledExtractor::JsonField(
                JsonPath::parse(path).map_err(|e| format!("invalid JSONPath '{path}': {e}"))?,
            ),
        })
    }
}

/// Extractor ready for evaluation (JSONPath parsed, base path normalized).
#[derive(Debug, Clone)]
pub enum CompiledExtractor {
    Method,
    Path(Option<String>),
    Header(String),
    Query(String),
    Body,
    JsonField(JsonPath),
}

impl CompiledExtractor {
    pub fn extract(&self, request: &RecordedRequest) -> Option<String> {
        match self {
            CompiledExtractor::Method => Some(request.method.clone()),
            CompiledExtractor::Path(None) => Some(request.path.clone()),
            CompiledExtractor::Path(Some(base)) => strip_base_path(&request.path, base),
            CompiledExtractor::Header(name) => request.header(name).map(str::to_string),
            CompiledExtractor::Query(name) => request.query_param(name).map(str::to_string),
            CompiledExtractor::Body => Some(request.body_text()),
            CompiledExtractor::JsonField(path) => {
                let json: serde_json::Value = serde_json::from_slice(&request.body).ok()?;
                let nodes = path.query(&json);
                nodes.first().map(json_to_string)
            }
        }
    }
}

/// Unquoted for strings, compact JSON otherwise.
fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// `"/api/"` and `"api"` both become `"/api"`; an empty or root base path is no base path.
fn normalize_base_path(base: &str) -> Option<String> {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

/// Strip `base` from `path` at a segment boundary.
fn strip_base_path(path: &str, base: &str) -> Option<String> {
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Builds extractors, applying a shared base path to path extractors.
#[derive(Debug, Clone, Default)]
pub struct ExtractorFactory {
    base_path: Option<String>,
}

impl ExtractorFactory {
    pub fn new(base_path: Option<String>) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn method(&self) -> Extractor {
        Extractor::Method
    }

    pub fn path(&self) -> Extractor {
        Extractor::Path {
            base_path: self.base_path.clone(),
        }
    }

    pub fn header(&self, name: impl Into<String>) -> Extractor {
        Extractor::Header { name: name.into() }
    }

    pub fn query(&self, name: impl Into<String>) -> Extractor {
        Extractor::Query { name: name.into() }
    }

    pub fn body(&self) -> Extractor {
        Extractor::Body
    }

    pub fn json_field(&self, path: impl Into<String>) -> Extractor {
        Extractor::JsonField { path: path.into() }
    }
}
