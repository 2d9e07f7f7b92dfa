//! Compiled rule set evaluated by the server for every ordinary request.

use super::types::{ExpectationSet, Precedence, ResponseTemplate};
use crate::error::{Error, Result};
use crate::predicate::CompiledMatcher;
use crate::request::RecordedRequest;

#[derive(Debug)]
struct CompiledRule {
    matchers: Vec<CompiledMatcher>,
    response: ResponseTemplate,
    limit: Option<u32>,
    hits: u32,
}

impl CompiledRule {
    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.hits >= limit)
    }

    fn matches(&self, request: &RecordedRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(request))
    }
}

/// Rule that answered a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Declaration index of the rule within its set.
    pub index: usize,
    pub response: ResponseTemplate,
}

/// An [`ExpectationSet`] with every matcher compiled, plus per-rule hit counters.
#[derive(Debug, Default)]
pub struct RuleSet {
    precedence: Precedence,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every expectation; the first invalid one aborts compilation.
    pub fn compile(set: &ExpectationSet) -> Result<Self> {
        let rules = set
            .expectations
            .iter()
            .enumerate()
            .map(|(index, expectation)| {
                let matchers = expectation
                    .matchers
                    .iter()
                    .map(|m| m.compile())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|reason| Error::InvalidExpectation { index, reason })?;
                Ok(CompiledRule {
                    matchers,
                    response: expectation.response.clone(),
                    limit: expectation.limit,
                    hits: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            precedence: set.precedence,
            rules,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn candidate_order(&self) -> Vec<usize> {
        match self.precedence {
            Precedence::LatestFirst => (0..self.rules.len()).rev().collect(),
            Precedence::FirstDeclared => (0..self.rules.len()).collect(),
        }
    }

    /// Select the rule answering `request` and count the hit.
    ///
    /// Exhausted rules are skipped. `None` means the default response applies.
    pub fn evaluate(&mut self, request: &RecordedRequest) -> Option<RuleMatch> {
        for index in self.candidate_order() {
            let rule = &mut self.rules[index];
            if rule.exhausted() || !rule.matches(request) {
                continue;
            }
            rule.hits += 1;
            return Some(RuleMatch {
                index,
                response: rule.response.clone(),
            });
        }
        None
    }

    /// Hit count of the rule at declaration index `index`.
    pub fn hits(&self, index: usize) -> Option<u32> {
        self.rules.get(index).map(|r| r.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::Expectation;
    use crate::predicate::{ExtractorFactory, Matcher, MatcherFactory};
    use crate::request::sample_request;

    fn rule(path: Option<&str>, body: &str, limit: Option<u32>) -> Expectation {
        let x = ExtractorFactory::default();
        let m = MatcherFactory::new();
        Expectation {
            matchers: path
                .map(|p| vec![Matcher::new(x.path(), m.equals(p))])
                .unwrap_or_default(),
            response: ResponseTemplate {
                body: body.to_string(),
                ..Default::default()
            },
            limit,
        }
    }

    #[test]
    fn test_latest_declared_rule_wins() {
        let set = ExpectationSet::new(
            Precedence::LatestFirst,
            vec![rule(Some("/foo"), "A", None), rule(Some("/foo"), "B", None)],
        );
        let mut rules = RuleSet::compile(&set).unwrap();
        let hit = rules.evaluate(&sample_request("GET", "/foo", "")).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.response.body, "B");
    }

    #[test]
    fn test_earlier_rule_used_when_only_it_matches() {
        let set = ExpectationSet::new(
            Precedence::LatestFirst,
            vec![rule(Some("/foo"), "A", None), rule(Some("/bar"), "B", None)],
        );
        let mut rules = RuleSet::compile(&set).unwrap();
        let hit = rules.evaluate(&sample_request("GET", "/foo", "")).unwrap();
        assert_eq!(hit.response.body, "A");
        assert!(rules.evaluate(&sample_request("GET", "/baz", "")).is_none());
    }

    #[test]
    fn test_first_declared_precedence() {
        let set = ExpectationSet::new(
            Precedence::FirstDeclared,
            vec![rule(Some("/foo"), "A", None), rule(None, "catch-all", None)],
        );
        let mut rules = RuleSet::compile(&set).unwrap();
        let hit = rules.evaluate(&sample_request("GET", "/foo", "")).unwrap();
        assert_eq!(hit.response.body, "A");
    }

    #[test]
    fn test_exhausted_rule_falls_through() {
        let set = ExpectationSet::new(
            Precedence::LatestFirst,
            vec![rule(None, "default", None), rule(Some("/foo"), "once", Some(1))],
        );
        let mut rules = RuleSet::compile(&set).unwrap();
        let req = sample_request("GET", "/foo", "");
        assert_eq!(rules.evaluate(&req).unwrap().response.body, "once");
        assert_eq!(rules.evaluate(&req).unwrap().response.body, "default");
        assert_eq!(rules.hits(1), Some(1));
        assert_eq!(rules.hits(0), Some(1));
    }

    #[test]
    fn test_empty_matchers_match_everything() {
        let set = ExpectationSet::new(Precedence::LatestFirst, vec![rule(None, "any", None)]);
        let mut rules = RuleSet::compile(&set).unwrap();
        assert!(rules.evaluate(&sample_request("DELETE", "/x", "")).is_some());
    }

    #[test]
    fn test_invalid_rule_reports_its_index() {
        let mut bad = rule(None, "", None);
        bad.matchers.push(Matcher::new(
            ExtractorFactory::default().body(),
            MatcherFactory::new().pattern("[unclosed"),
        ));
        let set = ExpectationSet::new(Precedence::LatestFirst, vec![rule(None, "", None), bad]);
        match RuleSet::compile(&set) {
            Err(Error::InvalidExpectation { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("invalid pattern"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
