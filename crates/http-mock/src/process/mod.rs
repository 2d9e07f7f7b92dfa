//! Starting, probing, stopping and tracking mock servers.

mod probe;
mod registry;
mod server;

pub use probe::{wait_until_ready, PROBE_ATTEMPT_TIMEOUT, PROBE_INTERVAL};
pub use registry::{RegistryGuard, ServerRegistry};
pub use server::{LifecycleState, Server};
