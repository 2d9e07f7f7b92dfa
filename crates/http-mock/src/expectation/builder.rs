//! Fluent expectation builder.
//!
//! ```no_run
//! # use http_mock::{ExtractorFactory, MatcherFactory, MockBuilder};
//! let mut mock = MockBuilder::new(MatcherFactory::new(), ExtractorFactory::default());
//! mock.when()
//!     .method_is("GET")
//!     .path_is("/users/42")
//!     .then()
//!     .status_code(200)
//!     .body(r#"{"id": 42}"#)
//!     .end();
//! let set = mock.flush_expectations().unwrap();
//! assert_eq!(set.len(), 1);
//! ```

use super::rules::RuleSet;
use super::types::{Expectation, ExpectationSet, Precedence, ResponseTemplate};
use crate::error::Result;
use crate::predicate::{Comparison, Extractor, ExtractorFactory, Matcher, MatcherFactory};
use std::time::Duration;

/// Accumulates expectations in declaration order until they are flushed.
#[derive(Debug, Clone, Default)]
pub struct MockBuilder {
    matches: MatcherFactory,
    extract: ExtractorFactory,
    precedence: Precedence,
    pending: Vec<Expectation>,
}

impl MockBuilder {
    pub fn new(matches: MatcherFactory, extract: ExtractorFactory) -> Self {
        Self {
            matches,
            extract,
            precedence: Precedence::default(),
            pending: Vec::new(),
        }
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn set_precedence(&mut self, precedence: Precedence) {
        self.precedence = precedence;
    }

    /// Start declaring a new expectation.
    pub fn when(&mut self) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            mock: self,
            matchers: Vec::new(),
            limit: None,
        }
    }

    /// Expectations declared since the last flush.
    pub fn pending(&self) -> &[Expectation] {
        &self.pending
    }

    /// Drain the declared expectations into an ordered set.
    ///
    /// The buffer is reset even when a rule fails to compile.
    pub fn flush_expectations(&mut self) -> Result<ExpectationSet> {
        let set = ExpectationSet::new(self.precedence, std::mem::take(&mut self.pending));
        RuleSet::compile(&set)?;
        Ok(set)
    }

    /// Drop every declaration not yet flushed.
    pub fn discard(&mut self) {
        self.pending.clear();
    }
}

/// Request side of one expectation.
pub struct ExpectationBuilder<'a> {
    mock: &'a mut MockBuilder,
    matchers: Vec<Matcher>,
    limit: Option<u32>,
}

impl<'a> ExpectationBuilder<'a> {
    /// Add an arbitrary matcher.
    pub fn matching(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    fn with(self, extractor: Extractor, comparison: Comparison) -> Self {
        self.matching(Matcher::new(extractor, comparison))
    }

    pub fn method_is(self, method: &str) -> Self {
        let x = self.mock.extract.method();
        let m = self.mock.matches.equals(method.to_ascii_uppercase());
        self.with(x, m)
    }

    pub fn path_is(self, path: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.path(), self.mock.matches.equals(path));
        self.with(x, m)
    }

    pub fn path_matches(self, pattern: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.path(), self.mock.matches.pattern(pattern));
        self.with(x, m)
    }

    pub fn header_is(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.header(name), self.mock.matches.equals(value));
        self.with(x, m)
    }

    pub fn header_exists(self, name: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.header(name), self.mock.matches.exists());
        self.with(x, m)
    }

    pub fn query_param_is(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.query(name), self.mock.matches.equals(value));
        self.with(x, m)
    }

    pub fn query_param_exists(self, name: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.query(name), self.mock.matches.exists());
        self.with(x, m)
    }

    pub fn body_is(self, body: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.body(), self.mock.matches.equals(body));
        self.with(x, m)
    }

    pub fn body_contains(self, needle: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.body(), self.mock.matches.contains(needle));
        self.with(x, m)
    }

    pub fn body_matches(self, pattern: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.body(), self.mock.matches.pattern(pattern));
        self.with(x, m)
    }

    pub fn json_field_is(self, path: impl Into<String>, value: impl Into<String>) -> Self {
        let (x, m) = (self.mock.extract.json_field(path), self.mock.matches.equals(value));
        self.with(x, m)
    }

    /// Custom Rhai predicate over the value `extractor` pulls out.
    pub fn custom(self, extractor: Extractor, script: impl Into<String>) -> Self {
        let m = self.mock.matches.custom(script);
        self.with(extractor, m)
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    pub fn times(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Remove any call limit.
    pub fn any(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Switch to the response side.
    pub fn then(self) -> ResponseBuilder<'a> {
        ResponseBuilder {
            expectation: self,
            response: ResponseTemplate::default(),
        }
    }
}

/// Response side of one expectation; `end()` records it.
pub struct ResponseBuilder<'a> {
    expectation: ExpectationBuilder<'a>,
    response: ResponseTemplate,
}

impl ResponseBuilder<'_> {
    pub fn status_code(mut self, status: u16) -> Self {
        self.response.status_code = status;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.response.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    pub fn json_body(self, body: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(body.to_string())
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.response.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn end(self) {
        let ExpectationBuilder {
            mock,
            matchers,
            limit,
        } = self.expectation;
        mock.pending.push(Expectation {
            matchers,
            response: self.response,
            limit,
        });
    }
}
