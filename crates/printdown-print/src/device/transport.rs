// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte sinks the ESC/POS driver writes to.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use printdown_core::error::DeviceError;

/// Opens a fresh writer for each job.
pub trait Transport: Send {
    fn open(&mut self) -> Result<Box<dyn Write + Send>, DeviceError>;

    /// Human-readable target, for logs.
    fn describe(&self) -> String;
}

/// A character device (or plain file) opened for each job and closed after
/// it, so a printer that was unplugged and reconnected is picked up again.
#[derive(Debug, Clone)]
pub struct DeviceFile {
    path: PathBuf,
}

impl DeviceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for DeviceFile {
    fn open(&mut self) -> Result<Box<dyn Write + Send>, DeviceError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| DeviceError::Unavailable(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "device opened");
        Ok(Box::new(BufWriter::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Collects everything written into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self) -> Result<Box<dyn Write + Send>, DeviceError> {
        Ok(Box::new(SharedWriter(Arc::clone(&self.buf))))
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_file_appends_across_opens() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = DeviceFile::new(file.path());

        for chunk in [&b"one"[..], b"two"] {
            let mut writer = transport.open().unwrap();
            writer.write_all(chunk).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(std::fs::read(file.path()).unwrap(), b"onetwo");
    }

    #[test]
    fn missing_device_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DeviceFile::new(dir.path().join("lp9"));
        let err = transport.open().err().unwrap();
        assert!(matches!(err, DeviceError::Unavailable(_)));
    }

    #[test]
    fn memory_transport_shares_its_buffer() {
        let transport = MemoryTransport::new();
        let mut handle = transport.clone();
        handle.open().unwrap().write_all(b"abc").unwrap();
        assert_eq!(transport.contents(), b"abc");
    }
}
