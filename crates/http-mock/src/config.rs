//! Construction-time configuration of a mock server.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 28080;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    5000
}

/// How a server gets started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Launcher {
    /// Serve from a dedicated thread of the current process.
    #[default]
    InProcess,
    /// Spawn the `http-mock` binary as a child process.
    Binary { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on. 0 picks a free port (in-process launcher only).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix stripped from request paths before path matchers run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub launcher: Launcher,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: None,
            startup_timeout_ms: default_timeout_ms(),
            request_timeout_ms: default_timeout_ms(),
            launcher: Launcher::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.startup_timeout_ms == 0 {
            return Err(Error::Config(
                "startupTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "requestTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if let Launcher::Binary { path } = &self.launcher {
            if self.port == 0 {
                return Err(Error::Config(
                    "binary launcher needs an explicit port".to_string(),
                ));
            }
            if path.as_os_str().is_empty() {
                return Err(Error::Config("binary launcher path is empty".to_string()));
            }
        }
        if let Some(base) = &self.base_path {
            if !base.is_empty() && !base.starts_with('/') {
                return Err(Error::Config(format!(
                    "basePath must start with '/': {base}"
                )));
            }
        }
        Ok(())
    }
}
