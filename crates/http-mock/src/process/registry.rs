//! Process-wide bookkeeping of running servers.
//!
//! Every server that finishes `start()` is added here and removed again by
//! `stop()`. Whatever is still registered when the process exits is stopped by
//! an `atexit` hook installed on first use of the global registry, so no child
//! process outlives the test run.

use super::server::Server;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info};

static REGISTRY: Lazy<ServerRegistry> = Lazy::new(|| {
    // SAFETY: `cleanup_at_exit` is an `extern "C"` fn that never unwinds.
    let rc = unsafe { libc::atexit(cleanup_at_exit) };
    if rc != 0 {
        debug!("atexit registration failed ({}); rely on ServerRegistry::guard()", rc);
    }
    ServerRegistry::new()
});

extern "C" fn cleanup_at_exit() {
    let _ = catch_unwind(AssertUnwindSafe(|| REGISTRY.cleanup()));
}

#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: Mutex<Vec<Server>>,
}

impl ServerRegistry {
    /// A standalone registry without the exit hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ServerRegistry {
        &REGISTRY
    }

    pub fn add(&self, server: Server) {
        let mut servers = self.servers.lock();
        if !servers.iter().any(|s| s.id() == server.id()) {
            servers.push(server);
        }
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut servers = self.servers.lock();
        let before = servers.len();
        servers.retain(|s| s.id() != id);
        servers.len() != before
    }

    pub fn contains(&self, id: u64) -> bool {
        self.servers.lock().iter().any(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.servers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.lock().is_empty()
    }

    /// Stop every registered server. Safe to call any number of times.
    pub fn cleanup(&self) {
        // Stopping a server deregisters it, so release the lock first
        let servers = std::mem::take(&mut *self.servers.lock());
        if servers.is_empty() {
            return;
        }
        info!("Stopping {} registered mock server(s)", servers.len());
        for server in servers {
            server.stop();
        }
    }

    /// Scope guard that runs `cleanup()` on the global registry when dropped.
    pub fn guard() -> RegistryGuard {
        Lazy::force(&REGISTRY);
        RegistryGuard { _private: () }
    }
}

/// Returned by [`ServerRegistry::guard`].
#[must_use = "cleanup runs when the guard is dropped"]
#[derive(Debug)]
pub struct RegistryGuard {
    _private: (),
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        REGISTRY.cleanup();
    }
}
