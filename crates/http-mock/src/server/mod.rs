//! The mock server: HTTP surface, live expectations and request log.
//!
//! ## Module Structure
//!
//! - `log`: `RequestLog` and `LogQuery`
//! - `state`: `ServerState`, the single point of synchronized mutation
//! - `router`: classification of paths into ordinary and reserved routes
//! - `handler`: HTTP request handling
//! - `response`: response builders
//! - `listener`: `MockServer`, the bound listener and accept loop

mod handler;
mod listener;
mod log;
mod response;
mod router;
mod state;

pub use listener::MockServer;
pub use log::{LogQuery, RequestLog};
pub use response::{ERROR_HEADER, LOG_LENGTH_HEADER, OUT_OF_RANGE};
pub use router::{log_method, log_path, Route, EXPECTATIONS_PATH, HEALTH_PATH, REQUEST_PREFIX};
pub use state::{Answer, ServerState};
