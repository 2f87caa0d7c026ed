// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP operation dispatch.
//
// The printer exposes a fixed, minimal operation set.  Only Print-Job and
// Send-Document have a side effect: the document is converted to text and
// queued as a text job.  Job bookkeeping is not kept, so job queries answer
// with a fixed placeholder job (id 1) in the completed state.

use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use printdown_core::error::PrintdownError;
use printdown_core::types::PrintJob;
use printdown_document::convert::DocumentConverter;

use super::codec::{AttributeGroup, GroupTag, IppRequest, IppResponse, IppValue};
use crate::queue::JobQueue;

// ---------------------------------------------------------------------------
// Status codes (RFC 8011 SS4.1.6)
// ---------------------------------------------------------------------------

pub const STATUS_OK: u16 = 0x0000;
pub const STATUS_SERVER_ERROR_INTERNAL: u16 = 0x0500;
pub const STATUS_SERVER_ERROR_OPERATION_NOT_SUPPORTED: u16 = 0x0501;
pub const STATUS_SERVER_ERROR_NOT_ACCEPTING_JOBS: u16 = 0x0506;

// ---------------------------------------------------------------------------
// Attribute constants
// ---------------------------------------------------------------------------

/// printer-state: idle.
const PRINTER_STATE_IDLE: i32 = 3;
/// printer-state: processing.
const PRINTER_STATE_PROCESSING: i32 = 4;
/// job-state: pending.
const JOB_STATE_PENDING: i32 = 3;
/// job-state: completed.
const JOB_STATE_COMPLETED: i32 = 9;

/// The only job id ever reported.
const PLACEHOLDER_JOB_ID: i32 = 1;

const NATURAL_LANGUAGE: &str = "en-us";

/// Advertised in operations-supported.  Send-Document is accepted but not
/// listed.
const OPERATIONS_SUPPORTED: [Operation; 7] = [
    Operation::PrintJob,
    Operation::ValidateJob,
    Operation::CreateJob,
    Operation::CancelJob,
    Operation::GetJobAttributes,
    Operation::GetJobs,
    Operation::GetPrinterAttributes,
];

const DOCUMENT_FORMATS_SUPPORTED: [&str; 4] = [
    "application/pdf",
    // Advertised for client compatibility; PostScript is never converted and
    // such jobs fail with 0x0500.
    "application/postscript",
    "text/plain",
    "application/octet-stream",
];

/// Operations this printer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PrintJob,
    ValidateJob,
    CreateJob,
    SendDocument,
    CancelJob,
    GetJobAttributes,
    GetJobs,
    GetPrinterAttributes,
}

impl Operation {
    pub fn from_id(id: u16) -> Option<Self> {
        Some(match id {
            0x0002 => Self::PrintJob,
            0x0004 => Self::ValidateJob,
            0x0005 => Self::CreateJob,
            0x0006 => Self::SendDocument,
            0x0008 => Self::CancelJob,
            0x0009 => Self::GetJobAttributes,
            0x000A => Self::GetJobs,
            0x000B => Self::GetPrinterAttributes,
            _ => return None,
        })
    }

    pub fn id(self) -> u16 {
        match self {
            Self::PrintJob => 0x0002,
            Self::ValidateJob => 0x0004,
            Self::CreateJob => 0x0005,
            Self::SendDocument => 0x0006,
            Self::CancelJob => 0x0008,
            Self::GetJobAttributes => 0x0009,
            Self::GetJobs => 0x000A,
            Self::GetPrinterAttributes => 0x000B,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PrintJob => "Print-Job",
            Self::ValidateJob => "Validate-Job",
            Self::CreateJob => "Create-Job",
            Self::SendDocument => "Send-Document",
            Self::CancelJob => "Cancel-Job",
            Self::GetJobAttributes => "Get-Job-Attributes",
            Self::GetJobs => "Get-Jobs",
            Self::GetPrinterAttributes => "Get-Printer-Attributes",
        }
    }
}

/// Per-request facts supplied by the transport.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// `ipp://{host}/ipp/print`, as the client addressed us.
    pub printer_uri: String,
    /// Peer address, recorded as the job origin.
    pub origin: String,
}

impl RequestContext {
    pub fn new(host: &str, origin: impl Into<String>) -> Self {
        Self {
            printer_uri: format!("ipp://{host}/ipp/print"),
            origin: origin.into(),
        }
    }

    fn job_uri(&self) -> String {
        format!("{}/{PLACEHOLDER_JOB_ID}", self.printer_uri)
    }
}

/// Routes decoded requests to operation handlers.
pub struct Dispatcher {
    queue: JobQueue,
    converter: Arc<dyn DocumentConverter>,
    printer_name: String,
    started: Instant,
}

impl Dispatcher {
    pub fn new(
        queue: JobQueue,
        converter: Arc<dyn DocumentConverter>,
        printer_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            converter,
            printer_name: printer_name.into(),
            started: Instant::now(),
        }
    }

    /// Produce the response for one request.  Never fails: every outcome,
    /// including unknown operations, is an IPP status.
    pub fn dispatch(&self, request: &IppRequest, ctx: &RequestContext) -> IppResponse {
        let response = match Operation::from_id(request.operation_id) {
            Some(op) => {
                debug!(
                    operation = op.name(),
                    request_id = request.request_id,
                    origin = %ctx.origin,
                    "dispatching IPP operation"
                );
                match op {
                    Operation::PrintJob | Operation::SendDocument => {
                        self.handle_document(request, ctx, op)
                    }
                    Operation::ValidateJob => ok_response(request, "successful-ok"),
                    Operation::CreateJob => {
                        ok_response(request, "successful-ok").group(job_group(ctx, JOB_STATE_PENDING))
                    }
                    Operation::CancelJob => {
                        warn!(origin = %ctx.origin, "Cancel-Job requested -- jobs cannot be cancelled");
                        ok_response(request, "successful-ok")
                    }
                    Operation::GetJobAttributes => ok_response(request, "successful-ok")
                        .group(job_group(ctx, JOB_STATE_COMPLETED)),
                    Operation::GetJobs => ok_response(request, "successful-ok"),
                    Operation::GetPrinterAttributes => self.handle_get_printer_attributes(request, ctx),
                }
            }
            None => {
                warn!(
                    operation = %format!("0x{:04X}", request.operation_id),
                    origin = %ctx.origin,
                    "unsupported IPP operation"
                );
                error_response(
                    request,
                    STATUS_SERVER_ERROR_OPERATION_NOT_SUPPORTED,
                    &PrintdownError::UnsupportedOperation(request.operation_id).to_string(),
                )
            }
        };
        response.with_version(request.version_major, request.version_minor)
    }

    /// Print-Job / Send-Document: convert the document and queue it.
    fn handle_document(&self, request: &IppRequest, ctx: &RequestContext, op: Operation) -> IppResponse {
        let document = &request.document;
        if document.is_empty() {
            warn!(operation = op.name(), origin = %ctx.origin, "no document data -- nothing to print");
            return ok_response(request, "successful-ok").group(job_group(ctx, JOB_STATE_PENDING));
        }

        let format = request.document_format();
        info!(
            operation = op.name(),
            origin = %ctx.origin,
            bytes = document.len(),
            format = format.unwrap_or("unspecified"),
            sha256 = %hex::encode(Sha256::digest(document)),
            "document received"
        );

        let text = match self.converter.convert(document, format) {
            Ok(text) => text,
            Err(e) => {
                error!(operation = op.name(), origin = %ctx.origin, error = %e, "document conversion failed");
                return error_response(request, STATUS_SERVER_ERROR_INTERNAL, &e.to_string());
            }
        };

        match self.queue.submit(PrintJob::text(text, ctx.origin.clone())) {
            Ok(job_id) => {
                info!(operation = op.name(), job_id = %job_id, "IPP job accepted");
                ok_response(request, "successful-ok").group(job_group(ctx, JOB_STATE_PENDING))
            }
            Err(PrintdownError::QueueClosed) => error_response(
                request,
                STATUS_SERVER_ERROR_NOT_ACCEPTING_JOBS,
                "printer is shutting down",
            ),
            Err(e) => {
                error!(error = %e, "failed to queue job");
                error_response(request, STATUS_SERVER_ERROR_INTERNAL, &e.to_string())
            }
        }
    }

    /// Get-Printer-Attributes: the whole capability set, whatever was asked.
    fn handle_get_printer_attributes(&self, request: &IppRequest, ctx: &RequestContext) -> IppResponse {
        let requested = request.requested_attributes();
        if !requested.is_empty() {
            debug!(requested = ?requested, "requested-attributes (full set returned)");
        }

        let queued = i32::try_from(self.queue.len()).unwrap_or(i32::MAX);
        let state = if queued > 0 {
            PRINTER_STATE_PROCESSING
        } else {
            PRINTER_STATE_IDLE
        };
        let up_time = i32::try_from(self.started.elapsed().as_secs())
            .unwrap_or(i32::MAX)
            .max(1);
        let operations: Vec<i32> = OPERATIONS_SUPPORTED
            .iter()
            .map(|op| i32::from(op.id()))
            .collect();

        let printer = AttributeGroup::new(GroupTag::Printer)
            .uri("printer-uri-supported", &ctx.printer_uri)
            .keyword("uri-security-supported", "none")
            .keyword("uri-authentication-supported", "none")
            .name_attr("printer-name", &self.printer_name)
            .text("printer-info", &self.printer_name)
            .text("printer-make-and-model", "PrintDown ESC/POS thermal printer")
            .enum_attr("printer-state", state)
            .keyword("printer-state-reasons", "none")
            .boolean("printer-is-accepting-jobs", !self.queue.is_closed())
            .integer("queued-job-count", queued)
            .integer("printer-up-time", up_time)
            .enums("operations-supported", &operations)
            .mime_types("document-format-supported", &DOCUMENT_FORMATS_SUPPORTED)
            .with(
                "document-format-default",
                IppValue::MimeMediaType("application/pdf".into()),
            )
            .keyword("compression-supported", "none")
            .charset("charset-configured", "utf-8")
            .charset("charset-supported", "utf-8")
            .natural_language("natural-language-configured", NATURAL_LANGUAGE)
            .natural_language("generated-natural-language-supported", NATURAL_LANGUAGE)
            .keywords("ipp-versions-supported", &["1.1", "2.0"])
            .keyword("pdl-override-supported", "not-attempted");

        ok_response(request, "successful-ok").group(printer)
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn operation_group(message: &str) -> AttributeGroup {
    AttributeGroup::new(GroupTag::Operation)
        .charset("attributes-charset", "utf-8")
        .natural_language("attributes-natural-language", NATURAL_LANGUAGE)
        .text("status-message", message)
}

fn ok_response(request: &IppRequest, message: &str) -> IppResponse {
    IppResponse::new(STATUS_OK, request.request_id).group(operation_group(message))
}

fn error_response(request: &IppRequest, status: u16, message: &str) -> IppResponse {
    IppResponse::new(status, request.request_id).group(operation_group(message))
}

fn job_group(ctx: &RequestContext, job_state: i32) -> AttributeGroup {
    let reason = if job_state == JOB_STATE_COMPLETED {
        "job-completed-successfully"
    } else {
        "none"
    };
    AttributeGroup::new(GroupTag::Job)
        .uri("job-uri", &ctx.job_uri())
        .integer("job-id", PLACEHOLDER_JOB_ID)
        .enum_attr("job-state", job_state)
        .keyword("job-state-reasons", reason)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
