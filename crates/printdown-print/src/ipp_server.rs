// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP print server.
//
// Clients (CUPS, macOS, Windows, mobile) POST an IPP request to
// `/ipp/print`.  Each connection carries exactly one request:
//
// 1. Parse the HTTP head; anything but POST gets 405.
// 2. Honour `Expect: 100-continue`, then read the body (Content-Length or
//    chunked).
// 3. A body shorter than the 8-byte IPP header gets 400.
// 4. Decode, dispatch on a blocking thread (document conversion can be
//    slow), and answer `200 OK` with `application/ipp`.
//
// Printing happens later on the executor thread; the response only
// confirms that the job was queued.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use printdown_core::config::AppConfig;
use printdown_core::error::{PrintdownError, Result};
use printdown_core::types::ServerStatus;
use printdown_document::convert::DocumentConverter;

use crate::http;
use crate::ipp::codec;
use crate::ipp::dispatch::{Dispatcher, RequestContext};
use crate::listener::Listener;
use crate::queue::JobQueue;

/// Default IPP port.  631 needs root, so the server defaults to 6310.
pub const DEFAULT_PORT: u16 = 6310;

/// Resource path advertised in the mDNS `rp` record.
pub const PRINTER_PATH: &str = "/ipp/print";

const CONTENT_TYPE_IPP: &str = "application/ipp";

/// Longest a client may take to deliver its request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedded IPP server.
pub struct IppServer {
    listener: Listener,
    printer_name: String,
    max_request_bytes: usize,
}

impl IppServer {
    /// Create a stopped server for the given bind address.
    pub fn new(addr: SocketAddr) -> Self {
        let defaults = AppConfig::default();
        Self {
            listener: Listener::new("ipp", addr),
            printer_name: defaults.printer_name,
            max_request_bytes: defaults.max_request_bytes,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(SocketAddr::new(config.bind_address, config.ipp_port))
            .with_printer_name(&config.printer_name)
            .with_max_request_bytes(config.max_request_bytes)
    }

    pub fn with_printer_name(mut self, name: &str) -> Self {
        self.printer_name = name.to_owned();
        self
    }

    pub fn with_max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// The bound port while running, otherwise the configured one.
    pub fn port(&self) -> u16 {
        self.local_addr()
            .map_or_else(|| self.listener.addr().port(), |a| a.port())
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

    /// Bind and start serving.  Accepted documents are converted with
    /// `converter` and queued on `queue`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is already in use or the listener
    /// cannot be created.
    pub async fn start(
        &mut self,
        queue: JobQueue,
        converter: Arc<dyn DocumentConverter>,
    ) -> Result<()> {
        let shared = Arc::new(Shared {
            dispatcher: Arc::new(Dispatcher::new(queue, converter, self.printer_name.clone())),
            max_request_bytes: self.max_request_bytes,
        });

        self.listener
            .start(move |stream, peer| handle_connection(stream, peer, Arc::clone(&shared)))
            .await
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn stop(&mut self) -> Result<()> {
        self.listener.stop().await
    }
}

struct Shared {
    dispatcher: Arc<Dispatcher>,
    max_request_bytes: usize,
}

#[instrument(skip_all, fields(peer = %peer))]
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
) -> Result<()> {
    let local = stream.local_addr()?;
    let (read_half, mut writer) = stream.split();
    let mut reader = BufReader::new(read_half);

    let head = match timeout(REQUEST_TIMEOUT, http::read_head(&mut reader)).await {
        Ok(Ok(Some(head))) => head,
        Ok(Ok(None)) => {
            debug!("connection closed without a request");
            return Ok(());
        }
        Ok(Err(e)) => {
            warn!(error = %e, "unreadable HTTP request");
            return http::write_response(&mut writer, 400, "Bad Request", "text/plain", b"bad request")
                .await;
        }
        Err(_) => return Err(PrintdownError::PrintServer("timed out reading request".into())),
    };

    if !head.method.eq_ignore_ascii_case("POST") {
        debug!(method = %head.method, target = %head.target, "non-POST request rejected");
        return http::write_response(
            &mut writer,
            405,
            "Method Not Allowed",
            "text/plain",
            b"IPP requests must use POST",
        )
        .await;
    }

    if head.expects_continue() {
        http::write_continue(&mut writer).await?;
    }

    let body = match timeout(
        REQUEST_TIMEOUT,
        http::read_body(&mut reader, &head, shared.max_request_bytes),
    )
    .await
    {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            warn!(error = %e, "failed to read request body");
            return http::write_response(&mut writer, 400, "Bad Request", "text/plain", b"bad request body")
                .await;
        }
        Err(_) => return Err(PrintdownError::PrintServer("timed out reading request body".into())),
    };

    let request = match codec::decode(&body).map_err(PrintdownError::from) {
        Ok(request) => request,
        Err(e) => {
            warn!(bytes = body.len(), error = %e, "rejecting IPP request");
            let message = e.to_string();
            return http::write_response(&mut writer, 400, "Bad Request", "text/plain", message.as_bytes())
                .await;
        }
    };

    debug!(
        version = %format!("{}.{}", request.version_major, request.version_minor),
        operation_id = %format!("0x{:04X}", request.operation_id),
        request_id = request.request_id,
        groups = request.groups.len(),
        doc_bytes = request.document.len(),
        "parsed IPP request"
    );

    let host = head
        .host()
        .map(str::to_owned)
        .unwrap_or_else(|| local.to_string());
    let ctx = RequestContext::new(&host, peer.to_string());
    let dispatcher = Arc::clone(&shared.dispatcher);
    let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&request, &ctx))
        .await
        .map_err(|e| PrintdownError::PrintServer(format!("dispatch task: {e}")))?;

    let bytes = response.to_bytes();
    http::write_response(&mut writer, 200, "OK", CONTENT_TYPE_IPP, &bytes).await?;

    info!(
        status = %format!("0x{:04X}", response.status),
        response_bytes = bytes.len(),
        "IPP response sent"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipp::codec::{AttributeGroup, GroupTag, IppRequest, IppResponse};
    use crate::ipp::dispatch::{STATUS_OK, STATUS_SERVER_ERROR_OPERATION_NOT_SUPPORTED};
    use printdown_document::convert::TextExtractor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn running(queue: &JobQueue) -> IppServer {
        let mut server = IppServer::new(([127, 0, 0, 1], 0).into()).with_printer_name("Test");
        server.start(queue.clone(), Arc::new(TextExtractor)).await.unwrap();
        server
    }

    fn ipp_request(op: u16, document: &[u8]) -> Vec<u8> {
        let mut req = IppRequest::new(op, 9);
        req.version_major = 2;
        req.version_minor = 0;
        req.groups.push(
            AttributeGroup::new(GroupTag::Operation)
                .charset("attributes-charset", "utf-8")
                .natural_language("attributes-natural-language", "en"),
        );
        req.document = document.to_vec();
        req.to_bytes()
    }

    fn post(body: &[u8]) -> Vec<u8> {
        let mut raw = format!(
            "POST /ipp/print HTTP/1.1\r\nHost: printer.test:631\r\n\
             Content-Type: application/ipp\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    async fn exchange(server: &IppServer, raw: &[u8]) -> (String, Vec<u8>) {
        let mut stream = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        split_response(&response)
    }

    fn split_response(response: &[u8]) -> (String, Vec<u8>) {
        let end = response
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("HTTP head terminator");
        (
            String::from_utf8_lossy(&response[..end]).into_owned(),
            response[end + 4..].to_vec(),
        )
    }

    #[tokio::test]
    async fn get_printer_attributes_round_trip() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;

        let (head, body) = exchange(&server, &post(&ipp_request(0x000B, b""))).await;
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(head.contains("Content-Type: application/ipp"));

        let response = IppResponse::from_bytes(&body).unwrap();
        assert_eq!(response.status, STATUS_OK);
        assert_eq!(response.request_id, 9);
        assert_eq!((response.version_major, response.version_minor), (2, 0));
        let printer = response.find_group(GroupTag::Printer).unwrap();
        assert_eq!(
            printer.get_str("printer-uri-supported"),
            Some("ipp://printer.test:631/ipp/print")
        );
        assert_eq!(printer.get_str("printer-name"), Some("Test"));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn print_job_is_queued() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;

        let (_, body) = exchange(&server, &post(&ipp_request(0x0002, b"**Hello**\n"))).await;
        assert_eq!(IppResponse::from_bytes(&body).unwrap().status, STATUS_OK);
        assert_eq!(queue.len(), 1);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_operation_is_reported_in_ipp() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;

        let (head, body) = exchange(&server, &post(&ipp_request(0x1234, b"data"))).await;
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        let response = IppResponse::from_bytes(&body).unwrap();
        assert_eq!(response.status, STATUS_SERVER_ERROR_OPERATION_NOT_SUPPORTED);
        assert!(queue.is_empty());

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn short_body_is_bad_request() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;

        let (head, body) = exchange(&server, &post(&[0x01, 0x01, 0x00])).await;
        assert!(head.starts_with("HTTP/1.1 400"));
        assert_eq!(
            String::from_utf8_lossy(&body),
            "malformed IPP request: IPP message too short: 3 bytes (minimum 8)"
        );
        assert!(queue.is_empty());

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn get_is_method_not_allowed() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;

        let (head, _) = exchange(&server, b"GET /ipp/print HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(head.starts_with("HTTP/1.1 405"));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn expect_continue_gets_interim_response() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;
        let body = ipp_request(0x0004, b"");

        let mut stream = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();
        let head = format!(
            "POST /ipp/print HTTP/1.1\r\nHost: x\r\nExpect: 100-continue\r\n\
             Content-Length: {}\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();

        let interim = b"HTTP/1.1 100 Continue\r\n\r\n";
        let mut buf = vec![0u8; interim.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, interim);

        stream.write_all(&body).await.unwrap();
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        let (final_head, ipp) = split_response(&rest);
        assert!(final_head.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(IppResponse::from_bytes(&ipp).unwrap().status, STATUS_OK);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn chunked_request_is_accepted() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;
        let body = ipp_request(0x0002, b"chunked text");

        let (first, second) = body.split_at(10);
        let mut raw = b"POST /ipp/print HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        for chunk in [first, second] {
            raw.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            raw.extend_from_slice(chunk);
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"0\r\n\r\n");

        let (head, _) = exchange(&server, &raw).await;
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(queue.len(), 1);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn missing_host_falls_back_to_local_address() {
        let queue = JobQueue::new();
        let mut server = running(&queue).await;
        let addr = server.local_addr().unwrap();

        let body = ipp_request(0x000B, b"");
        let mut raw = format!("POST /ipp/print HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len())
            .into_bytes();
        raw.extend_from_slice(&body);

        let (_, ipp) = exchange(&server, &raw).await;
        let response = IppResponse::from_bytes(&ipp).unwrap();
        let printer = response.find_group(GroupTag::Printer).unwrap();
        assert_eq!(
            printer.get_str("printer-uri-supported"),
            Some(format!("ipp://{addr}/ipp/print").as_str())
        );

        server.stop().await.unwrap();
    }
}
