// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TCP listener lifecycle shared by the front-ends.
//
// `start` binds and spawns an accept loop; every accepted connection gets its
// own task running the supplied handler.  `stop` signals the loop through a
// `Notify` and awaits it.  Connections already being served run to
// completion on their own.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use printdown_core::error::{PrintdownError, Result};
use printdown_core::types::ServerStatus;

pub(crate) struct Listener {
    /// Short name used in logs ("ipp", "text", "image").
    label: &'static str,
    /// Requested bind address; port 0 picks a free port.
    addr: SocketAddr,
    status: ServerStatus,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
    local_addr: Option<SocketAddr>,
}

impl Listener {
    pub fn new(label: &'static str, addr: SocketAddr) -> Self {
        Self {
            label,
            addr,
            status: ServerStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            local_addr: None,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub async fn start<H, Fut>(&mut self, handler: H) -> Result<()>
    where
        H: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.status == ServerStatus::Running {
            debug!(listener = self.label, "already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let listener = match TcpListener::bind(self.addr).await {
            Ok(l) => l,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(PrintdownError::PrintServer(format!(
                    "{} listener: bind {}: {e}",
                    self.label, self.addr
                )));
            }
        };
        let local_addr = listener.local_addr()?;
        info!(listener = self.label, addr = %local_addr, "listening");

        let shutdown = Arc::clone(&self.shutdown_signal);
        let connections = Arc::clone(&self.active_connections);
        let label = self.label;
        let handler = Arc::new(handler);

        self.task_handle = Some(tokio::spawn(async move {
            accept_loop(label, listener, shutdown, connections, handler).await;
        }));
        self.local_addr = Some(local_addr);
        self.status = ServerStatus::Running;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(listener = self.label, "stopping");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| PrintdownError::PrintServer(format!("task join: {e}")))?;
        }

        self.local_addr = None;
        self.status = ServerStatus::Stopped;
        info!(listener = self.label, "stopped");
        Ok(())
    }
}

async fn accept_loop<H, Fut>(
    label: &'static str,
    listener: TcpListener,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicU32>,
    handler: Arc<H>,
) where
    H: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!(listener = label, "accept loop received shutdown signal");
                break;
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(listener = label, peer = %peer, "connection accepted");
                        let handler = Arc::clone(&handler);
                        let connections = Arc::clone(&connections);
                        tokio::spawn(async move {
                            let _active = ActiveConnection::enter(connections);
                            if let Err(e) = handler(stream, peer).await {
                                warn!(listener = label, peer = %peer, error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(listener = label, error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}

/// Counts one connection for as long as it lives, including when its
/// handler unwinds.
struct ActiveConnection(Arc<AtomicU32>);

impl ActiveConnection {
    fn enter(counter: Arc<AtomicU32>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
