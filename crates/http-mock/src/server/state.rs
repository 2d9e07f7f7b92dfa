//! Live expectation set and request log of one server.
//!
//! Both sit behind a single mutex: matching a request, counting the hit and
//! appending it to the log happen in one critical section, and `set_up`/`clean`
//! swap rules and log together.

use super::log::{LogQuery, RequestLog};
use crate::error::Result;
use crate::expectation::{ExpectationSet, ResponseTemplate, RuleSet};
use crate::request::RecordedRequest;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    expectations: ExpectationSet,
    rules: RuleSet,
    log: RequestLog,
}

/// Outcome of handling one ordinary request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub sequence: u64,
    /// Declaration index of the matched expectation, if any.
    pub matched: Option<usize>,
    pub response: ResponseTemplate,
}

#[derive(Debug, Default)]
pub struct ServerState {
    inner: Mutex<Inner>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `request`, record it, and return the response to send.
    pub fn answer(&self, request: RecordedRequest) -> Answer {
        let mut inner = self.inner.lock();
        let hit = inner.rules.evaluate(&request);
        let sequence = inner.log.append(request);
        drop(inner);

        match hit {
            Some(hit) => {
                debug!("Request #{} matched expectation {}", sequence, hit.index);
                Answer {
                    sequence,
                    matched: Some(hit.index),
                    response: hit.response,
                }
            }
            None => {
                debug!("Request #{} matched no expectation", sequence);
                Answer {
                    sequence,
                    matched: None,
                    response: ResponseTemplate::not_found(),
                }
            }
        }
    }

    /// Replace the expectation set and clear the log.
    ///
    /// The set is compiled before the lock is taken; on error nothing changes.
    pub fn set_up(&self, expectations: ExpectationSet) -> Result<()> {
        let rules = RuleSet::compile(&expectations)?;
        let mut inner = self.inner.lock();
        inner.expectations = expectations;
        inner.rules = rules;
        inner.log.clear();
        Ok(())
    }

    pub fn clean(&self) {
        let mut inner = self.inner.lock();
        inner.expectations = ExpectationSet::default();
        inner.rules = RuleSet::default();
        inner.log.clear();
    }

    pub fn query(&self, query: LogQuery) -> Result<RecordedRequest> {
        self.inner.lock().log.query(query)
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().log.len()
    }

    pub fn expectations(&self) -> ExpectationSet {
        self.inner.lock().expectations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::{Expectation, Precedence};
    use crate::predicate::{Comparison, Extractor, Matcher};
    use crate::request::sample_request;
    use std::sync::Arc;

    fn set_with(path: &str, body: &str) -> ExpectationSet {
        ExpectationSet::new(
            Precedence::LatestFirst,
            vec![Expectation {
                matchers: vec![Matcher::new(
                    Extractor::Path { base_path: None },
                    Comparison::Equals(path.to_string()),
                )],
                response: ResponseTemplate {
                    body: body.to_string(),
                    ..Default::default()
                },
                limit: None,
            }],
        )
    }

    #[test]
    fn test_unmatched_request_is_recorded_with_404() {
        let state = ServerState::new();
        let answer = state.answer(sample_request("GET", "/nothing", ""));
        assert_eq!(answer.matched, None);
        assert_eq!(answer.response.status_code, 404);
        assert_eq!(state.request_count(), 1);
        assert_eq!(state.query(LogQuery::Last).unwrap().path, "/nothing");
    }

    #[test]
    fn test_set_up_replaces_rules_and_clears_log() {
        let state = ServerState::new();
        state.set_up(set_with("/a", "A")).unwrap();
        assert_eq!(state.answer(sample_request("GET", "/a", "")).response.body, "A");

        state.set_up(set_with("/b", "B")).unwrap();
        assert_eq!(state.request_count(), 0);
        assert_eq!(
            state.answer(sample_request("GET", "/a", "")).response.status_code,
            404
        );
        assert_eq!(state.answer(sample_request("GET", "/b", "")).response.body, "B");
    }

    #[test]
    fn test_failed_set_up_leaves_state_untouched() {
        let state = ServerState::new();
        state.set_up(set_with("/a", "A")).unwrap();
        state.answer(sample_request("GET", "/a", ""));

        let mut bad = set_with("/b", "B");
        bad.expectations[0].matchers[0].comparison = Comparison::Matches("(".to_string());
        assert!(state.set_up(bad).is_err());

        assert_eq!(state.request_count(), 1);
        assert_eq!(state.expectations(), set_with("/a", "A"));
        assert_eq!(state.answer(sample_request("GET", "/a", "")).response.body, "A");
    }

    #[test]
    fn test_clean_behaves_like_fresh_server() {
        let state = ServerState::new();
        state.set_up(set_with("/a", "A")).unwrap();
        state.answer(sample_request("GET", "/a", ""));
        state.clean();

        assert_eq!(state.request_count(), 0);
        assert!(state.expectations().is_empty());
        assert_eq!(
            state.answer(sample_request("GET", "/a", "")).response.status_code,
            404
        );
    }

    #[test]
    fn test_concurrent_answers_get_distinct_sequences() {
        let state = Arc::new(ServerState::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            state
                                .answer(sample_request("GET", &format!("/{t}/{i}"), ""))
                                .sequence
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut sequences: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (0..400).collect::<Vec<u64>>());

        let logged: Vec<u64> = (0..400)
            .map(|i| state.query(LogQuery::At(i)).unwrap().sequence)
            .collect();
        assert!(logged.windows(2).all(|w| w[0] < w[1]));
    }
}
