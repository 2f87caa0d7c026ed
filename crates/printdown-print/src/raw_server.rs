// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP front-ends ("JetDirect"-style sockets).
//
// A client connects and streams bytes.  The job is complete when the client
// closes its side, goes quiet for the idle timeout, or reaches the byte cap.
// Text sockets decode the bytes as CP437; image sockets keep them as-is.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use printdown_core::config::AppConfig;
use printdown_core::error::{PrintdownError, Result};
use printdown_core::types::{JobKind, PrintJob, ServerStatus};
use printdown_document::cp437;

use crate::listener::Listener;
use crate::queue::JobQueue;

const READ_CHUNK: usize = 4096;

/// Characters of a text job echoed to the debug log.
const PREVIEW_CHARS: usize = 100;

/// One raw listener, producing jobs of a single kind.
pub struct RawServer {
    kind: JobKind,
    listener: Listener,
    idle_timeout: Duration,
    max_bytes: usize,
}

impl RawServer {
    pub fn new(kind: JobKind, addr: SocketAddr) -> Self {
        let defaults = AppConfig::default();
        let label = match kind {
            JobKind::Text => "text",
            JobKind::Image => "image",
        };
        Self {
            kind,
            listener: Listener::new(label, addr),
            idle_timeout: defaults.idle_timeout(),
            max_bytes: defaults.max_request_bytes,
        }
    }

    /// Text listener on the configured text port.
    pub fn text(config: &AppConfig) -> Self {
        Self::new(JobKind::Text, SocketAddr::new(config.bind_address, config.text_port))
            .with_limits(config.idle_timeout(), config.max_request_bytes)
    }

    /// Image listener on the configured image port.
    pub fn image(config: &AppConfig) -> Self {
        Self::new(JobKind::Image, SocketAddr::new(config.bind_address, config.image_port))
            .with_limits(config.idle_timeout(), config.max_request_bytes)
    }

    pub fn with_limits(mut self, idle_timeout: Duration, max_bytes: usize) -> Self {
        self.idle_timeout = idle_timeout;
        self.max_bytes = max_bytes;
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn status(&self) -> ServerStatus {
        self.listener.status()
    }

    pub fn active_connections(&self) -> u32 {
        self.listener.active_connections()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Bind and start accepting.  Every non-empty connection becomes one job
    /// on `queue`.
    pub async fn start(&mut self, queue: JobQueue) -> Result<()> {
        let settings = Arc::new(Connection {
            kind: self.kind,
            idle_timeout: self.idle_timeout,
            max_bytes: self.max_bytes,
            queue,
        });
        self.listener
            .start(move |stream, peer| Arc::clone(&settings).serve(stream, peer))
            .await
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.listener.stop().await
    }
}

struct Connection {
    kind: JobKind,
    idle_timeout: Duration,
    max_bytes: usize,
    queue: JobQueue,
}

impl Connection {
    #[instrument(skip_all, fields(kind = %self.kind, peer = %peer))]
    async fn serve(self: Arc<Self>, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let data = collect(&mut stream, self.idle_timeout, self.max_bytes).await?;
        if data.is_empty() {
            debug!("connection closed without data");
            return Ok(());
        }

        let origin = peer.to_string();
        let job = match self.kind {
            JobKind::Text => {
                let text = cp437::decode(&data);
                debug!(preview = %text.chars().take(PREVIEW_CHARS).collect::<String>(), "text received");
                PrintJob::text(text, origin)
            }
            JobKind::Image => PrintJob::image(data, origin),
        };
        info!(bytes = job.payload().len(), "raw job received");

        match self.queue.submit(job) {
            Ok(_) => Ok(()),
            Err(PrintdownError::QueueClosed) => {
                warn!("job dropped: printer is shutting down");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Read until EOF, `idle` without data, or `max_bytes`.
async fn collect(stream: &mut TcpStream, idle: Duration, max_bytes: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match timeout(idle, stream.read(&mut chunk)).await {
            Err(_) => {
                debug!(bytes = data.len(), "idle timeout -- treating data as complete");
                break;
            }
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                data.extend_from_slice(&chunk[..n]);
                if data.len() >= max_bytes {
                    warn!(limit = max_bytes, "raw job reached the size limit -- truncated");
                    data.truncate(max_bytes);
                    break;
                }
            }
            Ok(Err(e)) => return Err(e.into()),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Next;
    use printdown_core::types::JobPayload;
    use tokio::io::AsyncWriteExt;

    const WAIT: Duration = Duration::from_secs(5);

    async fn running(kind: JobKind, queue: &JobQueue) -> RawServer {
        let mut server = RawServer::new(kind, ([127, 0, 0, 1], 0).into())
            .with_limits(Duration::from_millis(100), 1024);
        server.start(queue.clone()).await.unwrap();
        server
    }

    /// Poll from a blocking thread so the runtime keeps serving.
    async fn next_payload(queue: &JobQueue) -> Option<JobPayload> {
        let queue = queue.clone();
        tokio::task::spawn_blocking(move || match queue.next_job(WAIT) {
            Next::Job(job) => Some(job.payload().clone()),
            _ => None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn text_is_decoded_as_cp437() {
        let queue = JobQueue::new();
        let mut server = running(JobKind::Text, &queue).await;

        let mut client = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        client.write_all(b"**Total** \x9C5\n").await.unwrap();
        client.shutdown().await.unwrap();

        match next_payload(&queue).await {
            Some(JobPayload::Text(text)) => assert_eq!(text, "**Total** £5\n"),
            other => panic!("unexpected payload: {other:?}"),
        }
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn idle_client_completes_the_job() {
        let queue = JobQueue::new();
        let mut server = running(JobKind::Image, &queue).await;

        // The connection stays open; only the idle timeout ends the job.
        let mut client = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        client.write_all(&[0x89, b'P', b'N', b'G']).await.unwrap();

        match next_payload(&queue).await {
            Some(JobPayload::Image(bytes)) => assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']),
            other => panic!("unexpected payload: {other:?}"),
        }
        drop(client);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn empty_connection_queues_nothing() {
        let queue = JobQueue::new();
        let mut server = running(JobKind::Text, &queue).await;

        let mut client = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        client.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(queue.is_empty());
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn oversized_job_is_truncated() {
        let queue = JobQueue::new();
        let mut server = running(JobKind::Image, &queue).await;

        let mut client = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        let _ = client.write_all(&[7u8; 3000]).await;
        let _ = client.shutdown().await;

        match next_payload(&queue).await {
            Some(JobPayload::Image(bytes)) => assert_eq!(bytes.len(), 1024),
            other => panic!("unexpected payload: {other:?}"),
        }
        server.stop().await.unwrap();
    }
}
