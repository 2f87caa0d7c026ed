// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PrintDown.

use thiserror::Error;

/// Top-level error type for all PrintDown operations.
#[derive(Debug, Error)]
pub enum PrintdownError {
    // -- Protocol errors --
    #[error("malformed IPP request: {0}")]
    ProtocolDecode(#[from] DecodeError),

    #[error("IPP operation 0x{0:04X} is not supported")]
    UnsupportedOperation(u16),

    #[error("print server error: {0}")]
    PrintServer(String),

    #[error("service advertisement failed: {0}")]
    Discovery(String),

    // -- Document errors --
    #[error("document conversion failed: {0}")]
    Conversion(String),

    // -- Job pipeline --
    #[error("job queue is closed")]
    QueueClosed,

    #[error("device fault: {0}")]
    Device(#[from] DeviceError),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to decode the fixed IPP header.
///
/// Truncation inside the attribute section is not an error; only a message
/// too short to carry version, operation id, and request id is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("IPP message too short: {len} bytes (minimum 8)")]
    MalformedHeader { len: usize },
}

/// Errors raised by a device driver while a job is being applied.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("device write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("image could not be rendered: {0}")]
    Image(String),

    #[error("device not prepared for a job")]
    NotReady,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdownError>;
