//! Lifecycle of one mock server: `stopped -> starting -> running -> stopped`.

use super::probe::wait_until_ready;
use super::registry::ServerRegistry;
use crate::client::MockClient;
use crate::config::{Launcher, ServerConfig};
use crate::error::{Error, Result};
use crate::expectation::ExpectationSet;
use crate::server::{MockServer, EXPECTATIONS_PATH};
use parking_lot::Mutex;
use reqwest::Method;
use std::fmt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

static NEXT_SERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
}

enum Lifecycle {
    Stopped,
    Starting,
    Running(Running),
}

/// A listener that is up and answering its health probe.
enum Running {
    InProcess {
        address: String,
        shutdown: oneshot::Sender<()>,
        thread: JoinHandle<()>,
    },
    Child {
        address: String,
        child: Child,
    },
}

impl Running {
    fn address(&self) -> &str {
        match self {
            Running::InProcess { address, .. } | Running::Child { address, .. } => address,
        }
    }

    /// Fails once the thread or child process behind the listener has ended.
    fn check_alive(&mut self) -> Result<()> {
        match self {
            Running::InProcess {
                address, thread, ..
            } => {
                if thread.is_finished() {
                    return Err(Error::Lifecycle(format!(
                        "server thread for {address} ended during startup"
                    )));
                }
                Ok(())
            }
            Running::Child { address, child } => match child.try_wait()? {
                Some(status) => Err(Error::Exited {
                    address: address.clone(),
                    status,
                }),
                None => Ok(()),
            },
        }
    }

    fn terminate(self) {
        match self {
            Running::InProcess {
                address,
                shutdown,
                thread,
            } => {
                let _ = shutdown.send(());
                if thread.join().is_err() {
                    warn!("Server thread for {} panicked", address);
                }
            }
            Running::Child { address, mut child } => {
                if let Err(e) = child.kill() {
                    debug!("Kill of {} (pid {}) failed: {}", address, child.id(), e);
                }
                if let Err(e) = child.wait() {
                    warn!("Failed to reap server process for {}: {}", address, e);
                }
            }
        }
    }
}

struct ServerHandle {
    id: u64,
    config: ServerConfig,
    http: reqwest::Client,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle to a mock server. Clones share the same underlying server.
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerHandle>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.inner.id)
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("state", &self.state())
            .finish()
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            inner: Arc::new(ServerHandle {
                id: NEXT_SERVER_ID.fetch_add(1, Ordering::Relaxed),
                config,
                http,
                lifecycle: Mutex::new(Lifecycle::Stopped),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Stopped => LifecycleState::Stopped,
            Lifecycle::Starting => LifecycleState::Starting,
            Lifecycle::Running(_) => LifecycleState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// `host:port` the server listens on, once running.
    pub fn address(&self) -> Option<String> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Running(running) => Some(running.address().to_string()),
            _ => None,
        }
    }

    pub fn base_url(&self) -> Result<String> {
        self.address()
            .map(|address| format!("http://{address}"))
            .ok_or_else(|| Error::Lifecycle(format!("server #{} is not running", self.id())))
    }

    /// Client bound to this server's base URL.
    pub fn client(&self) -> Result<MockClient> {
        Ok(MockClient::from_parts(self.base_url()?, self.inner.http.clone()))
    }

    /// Launch the listener and block until it answers its health probe.
    ///
    /// Starting a running server is a no-op. On probe timeout the listener is
    /// torn down, the server is left stopped and is never registered.
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            match &*lifecycle {
                Lifecycle::Running(_) => return Ok(()),
                Lifecycle::Starting => {
                    return Err(Error::Lifecycle(format!(
                        "server #{} is already starting",
                        self.id()
                    )))
                }
                Lifecycle::Stopped => *lifecycle = Lifecycle::Starting,
            }
        }

        let config = &self.inner.config;
        let launched = match &config.launcher {
            Launcher::InProcess => launch_in_process(&config.host, config.port).await,
            Launcher::Binary { path } => launch_binary(path, &config.host, config.port),
        };
        let mut running = match launched {
            Ok(running) => running,
            Err(e) => {
                *self.inner.lifecycle.lock() = Lifecycle::Stopped;
                return Err(e);
            }
        };

        let base_url = format!("http://{}", running.address());
        let ready = wait_until_ready(&self.inner.http, &base_url, config.startup_timeout(), || {
            running.check_alive()
        })
        .await;
        if let Err(e) = ready {
            warn!("Server at {} never became ready, tearing it down", base_url);
            running.terminate();
            *self.inner.lifecycle.lock() = Lifecycle::Stopped;
            return Err(e);
        }

        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Starting) {
                // stop() ran while waiting for readiness
                drop(lifecycle);
                running.terminate();
                return Err(Error::Lifecycle(format!(
                    "server #{} was stopped while starting",
                    self.id()
                )));
            }
            *lifecycle = Lifecycle::Running(running);
        }

        info!("Mock server #{} running at {}", self.id(), base_url);
        ServerRegistry::global().add(self.clone());
        Ok(())
    }

    /// Tear the listener down and deregister. Stopping a stopped server is a no-op.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.inner.lifecycle.lock(), Lifecycle::Stopped);
        if let Lifecycle::Running(running) = previous {
            info!("Stopping mock server #{} at {}", self.id(), running.address());
            running.terminate();
        }
        ServerRegistry::global().remove(self.id());
    }

    /// Atomically replace the server's expectations and clear its request log.
    pub async fn set_up(&self, expectations: &ExpectationSet) -> Result<()> {
        let body = serde_json::to_vec(expectations)?;
        self.call_expectations(Method::PUT, Some(body)).await?;
        debug!(
            "Installed {} expectation(s) on server #{}",
            expectations.len(),
            self.id()
        );
        Ok(())
    }

    /// Drop all expectations and recorded requests.
    pub async fn clean(&self) -> Result<()> {
        self.call_expectations(Method::DELETE, None).await
    }

    async fn call_expectations(&self, method: Method, body: Option<Vec<u8>>) -> Result<()> {
        let url = format!("{}{}", self.base_url()?, EXPECTATIONS_PATH);
        let mut request = self.inner.http.request(method, url);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Error::Rejected {
            path: EXPECTATIONS_PATH.to_string(),
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

/// Serve from a dedicated thread that owns its own runtime, so the server
/// outlives whichever runtime the caller happens to be on.
async fn launch_in_process(host: &str, port: u16) -> Result<Running> {
    let (ready_tx, ready_rx) = oneshot::channel::<Result<String>>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let host = host.to_string();

    let thread = std::thread::Builder::new()
        .name(format!("http-mock-{port}"))
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };
            runtime.block_on(async move {
                let server = match MockServer::bind(&host, port).await {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(server.local_addr().to_string()));
                server
                    .serve_until(async {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
            runtime.shutdown_timeout(Duration::from_millis(500));
        })?;

    let address = ready_rx.await.map_err(|_| {
        Error::Lifecycle("server thread exited before binding".to_string())
    })??;

    Ok(Running::InProcess {
        address,
        shutdown: shutdown_tx,
        thread,
    })
}

fn launch_binary(path: &Path, host: &str, port: u16) -> Result<Running> {
    // A child that cannot bind exits, but another listener on the port could
    // still answer the health probe in its place
    match std::net::TcpListener::bind((host, port)) {
        Ok(listener) => drop(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            return Err(Error::Lifecycle(format!("{host}:{port} is already in use")))
        }
        Err(e) => return Err(e.into()),
    }

    let child = Command::new(path)
        .arg("--host")
        .arg(host)
        .arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    debug!("Spawned {} as pid {}", path.display(), child.id());

    Ok(Running::Child {
        address: format!("{host}:{port}"),
        child,
    })
}
