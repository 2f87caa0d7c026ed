// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the PrintDown print server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which kind of payload a job carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Text,
    Image,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Image => "image",
        })
    }
}

/// The content of a print job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    /// Marked-up text, compiled to directives at execution time.
    Text(String),
    /// Encoded raster image bytes (JPEG, PNG, ...), handed to the device as-is.
    Image(Vec<u8>),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Text(_) => JobKind::Text,
            Self::Image(_) => JobKind::Image,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Image(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle states of a print job.
///
/// `Completed` and `Failed` are terminal; jobs are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted by the queue, waiting for the executor.
    Queued,
    /// Currently being applied to the device.
    Executing,
    /// All directives (or the image) reached the device.
    Completed,
    /// The device reported a fault part-way through the job.
    Failed,
}

/// A print job as submitted by one of the front-ends.
///
/// Fields are private so the payload cannot change after submission.
#[derive(Debug, Clone)]
pub struct PrintJob {
    id: JobId,
    payload: JobPayload,
    origin: String,
    submitted_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(payload: JobPayload, origin: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            payload,
            origin: origin.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Convenience constructor for a text job.
    pub fn text(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(JobPayload::Text(text.into()), origin)
    }

    /// Convenience constructor for an image job.
    pub fn image(bytes: Vec<u8>, origin: impl Into<String>) -> Self {
        Self::new(JobPayload::Image(bytes), origin)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    /// Peer address or other description of where the job came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Status of a network front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}
