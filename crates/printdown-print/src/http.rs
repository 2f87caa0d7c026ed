// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Just enough HTTP/1.1 to carry IPP: request head parsing, Content-Length
// and chunked bodies, `Expect: 100-continue`, and single-shot responses
// with `Connection: close`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use printdown_core::error::{PrintdownError, Result};

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// A parsed request line and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Case-insensitive header lookup (first occurrence).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    }

    pub fn expects_continue(&self) -> bool {
        self.header("expect")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("100-continue"))
    }

    pub fn host(&self) -> Option<&str> {
        self.header("host").map(str::trim).filter(|h| !h.is_empty())
    }
}

/// Read the request line and headers.  `Ok(None)` if the peer closed the
/// connection before sending anything.
pub async fn read_head<R>(reader: &mut R) -> Result<Option<RequestHead>>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0usize;
    let Some(request_line) = read_line(reader, &mut consumed).await? else {
        return Ok(None);
    };

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(PrintdownError::PrintServer(format!(
            "malformed request line: {request_line:?}"
        )));
    };
    let mut head = RequestHead {
        method: method.to_owned(),
        target: target.to_owned(),
        version: version.to_owned(),
        headers: Vec::new(),
    };

    loop {
        let line = read_line(reader, &mut consumed)
            .await?
            .ok_or_else(|| eof("headers"))?;
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            head.headers.push((name.trim().to_owned(), value.trim().to_owned()));
        }
    }

    Ok(Some(head))
}

/// Read the body as framed by the head.  Without framing headers the body
/// is empty.
pub async fn read_body<R>(reader: &mut R, head: &RequestHead, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    if head.is_chunked() {
        return read_chunked(reader, limit).await;
    }

    let len = head.content_length().unwrap_or(0);
    if len > limit {
        return Err(PrintdownError::PrintServer(format!(
            "request body of {len} bytes exceeds limit of {limit}"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

async fn read_chunked<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let mut consumed = 0usize;
    loop {
        let size_line = read_line(reader, &mut consumed)
            .await?
            .ok_or_else(|| eof("chunk size"))?;
        let size_field = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_field, 16).map_err(|_| {
            PrintdownError::PrintServer(format!("bad chunk size: {size_field:?}"))
        })?;

        if size == 0 {
            // Trailers, up to the blank line.
            while let Some(line) = read_line(reader, &mut consumed).await? {
                if line.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        if size > limit.saturating_sub(body.len()) {
            return Err(PrintdownError::PrintServer(format!(
                "chunked body exceeds limit of {limit} bytes"
            )));
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;

        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
        if crlf != *b"\r\n" {
            return Err(PrintdownError::PrintServer(
                "chunk data not followed by CRLF".into(),
            ));
        }
        consumed = 0;
    }
}

/// Read one CRLF- (or LF-) terminated line without the terminator.
async fn read_line<R>(reader: &mut R, consumed: &mut usize) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    let n = reader.read_until(b'\n', &mut raw).await?;
    if n == 0 {
        return Ok(None);
    }
    *consumed += n;
    if *consumed > MAX_HEAD_BYTES {
        return Err(PrintdownError::PrintServer("HTTP header section too large".into()));
    }
    while raw.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

fn eof(what: &str) -> PrintdownError {
    PrintdownError::PrintServer(format!("connection closed while reading {what}"))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Interim response sent before reading a body the client is holding back.
pub async fn write_continue<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Write a complete response and flush.  The connection is not reused.
pub async fn write_response<W>(
    writer: &mut W,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
