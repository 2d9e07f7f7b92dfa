//! Expectations: what the mock answers and how a test declares it.
//!
//! - `types`: serializable `Expectation`, `ExpectationSet`, `ResponseTemplate`
//! - `rules`: compiled `RuleSet` the server evaluates, with call-limit counters
//! - `builder`: fluent `MockBuilder` used by tests

mod builder;
mod rules;
mod types;

pub use builder::{ExpectationBuilder, MockBuilder, ResponseBuilder};
pub use rules::{RuleMatch, RuleSet};
pub use types::{Expectation, ExpectationSet, Precedence, ResponseTemplate};
