//! Comparisons and matchers.
//!
//! [`Matcher`] is the serializable form shipped to the server inside an
//! expectation set. [`CompiledMatcher`] is what the server evaluates: regexes,
//! JSONPath queries and scripts are compiled once when the set is installed.

use super::extractor::{CompiledExtractor, Extractor};
use super::script::ScriptPredicate;
use crate::request::RecordedRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Comparison applied to an extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum Comparison {
    /// Exact string equality
    Equals(String),
    /// Value contains substring
    Contains(String),
    /// Regex pattern match
    Matches(String),
    /// Presence (`true`) or absence (`false`) of the value
    Exists(bool),
    /// Rhai predicate; sees `value` and `request`, must yield a bool
    Script(String),
}

/// One extractor plus one comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    pub extractor: Extractor,
    pub comparison: Comparison,
}

impl Matcher {
    pub fn new(extractor: Extractor, comparison: Comparison) -> Self {
        Self {
            extractor,
            comparison,
        }
    }

    pub fn compile(&self) -> Result<CompiledMatcher, String> {
        Ok(CompiledMatcher {
            extractor: self.extractor.compile()?,
            comparison: CompiledComparison::compile(&self.comparison)?,
        })
    }
}

/// Compiled comparison for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledComparison {
    Equals(String),
    Contains(String),
    Matches(Arc<Regex>),
    Exists(bool),
    Script(Arc<ScriptPredicate>),
}

impl CompiledComparison {
    pub fn compile(comparison: &Comparison) -> Result<Self, String> {
        match comparison {
            Comparison::Equals(v) => Ok(CompiledComparison::Equals(v.clone())),
            Comparison::Contains(v) => Ok(CompiledComparison::Contains(v.clone())),
            Comparison::Matches(pattern) => Regex::new(pattern)
                .map(|re| CompiledComparison::Matches(Arc::new(re)))
                .map_err(|e| format!("invalid pattern '{pattern}': {e}")),
            Comparison::Exists(exists) => Ok(CompiledComparison::Exists(*exists)),
            Comparison::Script(source) => {
                ScriptPredicate::compile(source).map(|s| CompiledComparison::Script(Arc::new(s)))
            }
        }
    }

    pub fn matches(&self, value: Option<&str>, request: &RecordedRequest) -> bool {
        match (self, value) {
            (CompiledComparison::Exists(should_exist), v) => *should_exist == v.is_some(),
            // Scripts decide for themselves what an absent value means
            (CompiledComparison::Script(script), v) => script.evaluate(v, request),
            (_, None) => false,
            (CompiledComparison::Equals(expected), Some(v)) => v == expected,
            (CompiledComparison::Contains(needle), Some(v)) => v.contains(needle.as_str()),
            (CompiledComparison::Matches(regex), Some(v)) => regex.is_match(v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    extractor: CompiledExtractor,
    comparison: CompiledComparison,
}

impl CompiledMatcher {
    pub fn matches(&self, request: &RecordedRequest) -> bool {
        let value = self.extractor.extract(request);
        self.comparison.matches(value.as_deref(), request)
    }
}

/// Builds comparisons for the expectation builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatcherFactory;

impl MatcherFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn equals(&self, value: impl Into<String>) -> Comparison {
        Comparison::Equals(value.into())
    }

    pub fn contains(&self, value: impl Into<String>) -> Comparison {
        Comparison::Contains(value.into())
    }

    pub fn pattern(&self, pattern: impl Into<String>) -> Comparison {
        Comparison::Matches(pattern.into())
    }

    pub fn exists(&self) -> Comparison {
        Comparison::Exists(true)
    }

    pub fn missing(&self) -> Comparison {
        Comparison::Exists(false)
    }

    pub fn custom(&self, script: impl Into<String>) -> Comparison {
        Comparison::Script(script.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ExtractorFactory;
    use crate::request::sample_request;

    fn check(extractor: Extractor, comparison: Comparison, request: &RecordedRequest) -> bool {
        Matcher::new(extractor, comparison)
            .compile()
            .unwrap()
            .matches(request)
    }

    #[test]
    fn test_equals_contains_pattern() {
        let req = sample_request("POST", "/users/42", "name=ferris");
        let x = ExtractorFactory::default();
        let m = MatcherFactory::new();

        assert!(check(x.method(), m.equals("POST"), &req));
        assert!(!check(x.method(), m.equals("GET"), &req));
        assert!(check(x.body(), m.contains("ferris"), &req));
        assert!(!check(x.body(), m.contains("mock"), &req));
        assert!(check(x.path(), m.pattern(r"^/users/\d+$"), &req));
        assert!(!check(x.path(), m.pattern(r"^/orders/"), &req));
    }

    #[test]
    fn test_exists_and_missing() {
        let mut req = sample_request("GET", "/", "");
        req.headers.push("Authorization", "Bearer t");
        let x = ExtractorFactory::default();
        let m = MatcherFactory::new();

        assert!(check(x.header("authorization"), m.exists(), &req));
        assert!(!check(x.header("authorization"), m.missing(), &req));
        assert!(check(x.header("x-missing"), m.missing(), &req));
        assert!(!check(x.header("x-missing"), m.equals(""), &req));
    }

    #[test]
    fn test_custom_script_comparison() {
        let req = sample_request("PUT", "/items/7", "");
        let x = ExtractorFactory::default();
        let m = MatcherFactory::new();

        assert!(check(x.path(), m.custom(r#"value.starts_with("/items")"#), &req));
        assert!(check(x.method(), m.custom(r#"request.method == "PUT""#), &req));
        assert!(!check(x.method(), m.custom("false"), &req));
    }

    #[test]
    fn test_invalid_pattern_fails_to_compile() {
        let matcher = Matcher::new(Extractor::Body, Comparison::Matches("(unclosed".to_string()));
        let err = matcher.compile().unwrap_err();
        assert!(err.contains("invalid pattern"));
    }

    #[test]
    fn test_matcher_wire_format() {
        let matcher = Matcher::new(
            ExtractorFactory::new(Some("/api".to_string())).path(),
            MatcherFactory::new().equals("/users"),
        );
        let json = serde_json::to_value(&matcher).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "extractor": {"type": "path", "basePath": "/api"},
                "comparison": {"op": "equals", "value": "/users"}
            })
        );
        let back: Matcher = serde_json::from_value(json).unwrap();
        assert_eq!(back, matcher);
    }
}
