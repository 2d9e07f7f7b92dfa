//! TCP listener and accept loop.

use super::handler::handle_request;
use super::state::ServerState;
use crate::error::Result;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// A bound mock server, ready to serve.
pub struct MockServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
}

impl MockServer {
    /// Bind to `host:port`. Port 0 asks the OS for a free port.
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        info!("Mock server bound to {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
            state: Arc::new(ServerState::new()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, client_addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    async move { handle_request(req, state, client_addr).await }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error on {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", addr, e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Mock server on {} shutting down", addr);
                    break;
                }
            }
        }
    }
}
