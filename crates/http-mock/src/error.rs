//! Error types shared by the server, the process lifecycle and the client.

use std::time::Duration;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server never answered its health probe within the startup window.
    #[error("Server at {address} did not become reachable within {timeout:?}")]
    Connectivity { address: String, timeout: Duration },

    /// The server's own process went away before it answered its health probe.
    #[error("Server process for {address} exited during startup ({status})")]
    Exited {
        address: String,
        status: std::process::ExitStatus,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Cannot deserialize response from \"{path}\": \"{payload}\"")]
    Deserialization { path: String, payload: String },

    #[error("No recorded request for \"{query}\" (log holds {len} entries)")]
    OutOfRange { query: String, len: usize },

    #[error("Invalid collaborator \"{0}\" requested")]
    UnknownCollaborator(String),

    #[error("Invalid expectation #{index}: {reason}")]
    InvalidExpectation { index: usize, reason: String },

    #[error("Server rejected {path} with status {status}: {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Server lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Mismatches detected while validating an introspection response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Expected status code {expected} from \"{path}\", got {actual}")]
    UnexpectedStatus {
        path: String,
        expected: u16,
        actual: u16,
    },

    #[error("Expected content type \"{expected}\" from \"{path}\", got \"{actual}\"")]
    UnexpectedContentType {
        path: String,
        expected: String,
        actual: String,
    },
}

impl Error {
    /// Whether this error reports a read past either end of the request log.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OutOfRange { .. })
    }
}
