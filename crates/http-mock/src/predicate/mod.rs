//! Request matching primitives.
//!
//! An expectation is matched by a list of [`Matcher`]s, all of which must
//! hold (implicit AND). Each matcher pairs an [`Extractor`], which pulls one
//! comparable value out of a [`RecordedRequest`](crate::RecordedRequest), with
//! a [`Comparison`] applied to that value.
//!
//! # Module Structure
//!
//! - `extractor` - Extractors and the base-path aware `ExtractorFactory`
//! - `matcher` - Comparisons, matchers, their compiled forms and `MatcherFactory`
//! - `script` - Rhai-backed custom predicates

mod extractor;
mod matcher;
mod script;

pub use extractor::{CompiledExtractor, Extractor, ExtractorFactory};
pub use matcher::{CompiledComparison, CompiledMatcher, Comparison, Matcher, MatcherFactory};
pub use script::ScriptPredicate;
