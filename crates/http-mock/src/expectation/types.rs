//! Serializable expectation types exchanged between builder and server.

use crate::predicate::Matcher;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_status_code() -> u16 {
    200
}

/// Canned response returned when an expectation matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTemplate {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    /// Artificial latency applied before the response is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: Vec::new(),
            body: String::new(),
            delay_ms: None,
        }
    }
}

impl ResponseTemplate {
    /// Response for requests no expectation matched.
    pub fn not_found() -> Self {
        Self {
            status_code: 404,
            ..Default::default()
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

/// Matchers (AND-ed), the response to return, and an optional call limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    #[serde(default)]
    pub response: ResponseTemplate,
    /// Maximum number of requests this expectation answers; unlimited if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Order in which candidate expectations are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precedence {
    /// Most recently declared expectation wins.
    #[default]
    LatestFirst,
    /// Expectations are tried in declaration order.
    FirstDeclared,
}

/// Ordered expectations installed atomically on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationSet {
    #[serde(default)]
    pub precedence: Precedence,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

impl ExpectationSet {
    pub fn new(precedence: Precedence, expectations: Vec<Expectation>) -> Self {
        Self {
            precedence,
            expectations,
        }
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_set_uses_defaults() {
        let set: ExpectationSet =
            serde_json::from_str(r#"{"expectations": [{"response": {"body": "hi"}}]}"#).unwrap();
        assert_eq!(set.precedence, Precedence::LatestFirst);
        assert_eq!(set.len(), 1);
        let expectation = &set.expectations[0];
        assert!(expectation.matchers.is_empty());
        assert_eq!(expectation.response.status_code, 200);
        assert_eq!(expectation.response.body, "hi");
        assert_eq!(expectation.limit, None);
    }

    #[test]
    fn test_precedence_wire_names() {
        assert_eq!(
            serde_json::to_string(&Precedence::FirstDeclared).unwrap(),
            r#""firstDeclared""#
        );
        assert_eq!(
            serde_json::to_string(&Precedence::LatestFirst).unwrap(),
            r#""latestFirst""#
        );
    }

    #[test]
    fn test_not_found_template() {
        let template = ResponseTemplate::not_found();
        assert_eq!(template.status_code, 404);
        assert!(template.body.is_empty());
        assert!(template.delay().is_none());
    }
}
