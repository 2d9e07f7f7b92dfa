//! Stand-in HTTP server for tests.
//!
//! A test declares expectations (request matchers paired with canned
//! responses), points its code under test at a mock server, then pulls the
//! recorded requests back out to assert on them. One server is started per
//! test run and cleaned between tests.
//!
//! ## Module Structure
//!
//! - `request`: `RecordedRequest`, the immutable snapshot of one inbound request
//! - `predicate`: extractors, comparisons and Rhai script predicates
//! - `expectation`: expectation sets, compiled rule sets and the fluent builder
//! - `server`: the HTTP surface, live state and request log
//! - `process`: server lifecycle, health probe and process-wide registry
//! - `client`: request log accessor, HTTP transport and the `HttpMock` facade
//! - `config`: construction-time configuration
//!
//! ```no_run
//! use http_mock::{HttpMock, ServerConfig};
//!
//! # async fn run() -> http_mock::Result<()> {
//! let mut http_mock = HttpMock::start(ServerConfig::new("127.0.0.1", 0)).await?;
//! http_mock
//!     .mock()
//!     .when()
//!     .method_is("GET")
//!     .path_is("/users/7")
//!     .then()
//!     .status_code(200)
//!     .body("{\"id\":7}")
//!     .end();
//! http_mock.set_up().await?;
//!
//! // ... exercise the code under test ...
//!
//! let request = http_mock.requests()?.latest().await?;
//! assert_eq!(request.path, "/users/7");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod expectation;
pub mod predicate;
pub mod process;
pub mod request;
pub mod server;

pub use client::{Collaborator, HttpMock, MockClient, RawResponse, RequestCollection, Transport};
pub use config::{Launcher, ServerConfig};
pub use error::{Error, ProtocolError, Result};
pub use expectation::{
    Expectation, ExpectationBuilder, ExpectationSet, MockBuilder, Precedence, ResponseBuilder,
    ResponseTemplate, RuleSet,
};
pub use predicate::{
    Comparison, Extractor, ExtractorFactory, Matcher, MatcherFactory, ScriptPredicate,
};
pub use process::{LifecycleState, RegistryGuard, Server, ServerRegistry};
pub use request::{BasicAuth, Headers, RecordedRequest};
pub use server::{LogQuery, MockServer};
