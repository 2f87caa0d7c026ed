// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document-to-text conversion for documents received over IPP.
//
// A thermal printer prints text, so every IPP document is reduced to plain
// text before it is queued.  PDFs go through `lopdf` text extraction; text
// documents pass through.  Anything else is rejected and the IPP front-end
// answers with server-error-internal-error.

use lopdf::Document;
use tracing::{debug, info, instrument, warn};

use printdown_core::error::{PrintdownError, Result};

use crate::cp437;

/// Magic bytes at the start of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Converts a received document into printable text.
pub trait DocumentConverter: Send + Sync {
    /// Convert `document` to text.  `format` is the client's
    /// `document-format` hint, when it sent one.
    fn convert(&self, document: &[u8], format: Option<&str>) -> Result<String>;
}

/// Formats the default converter understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Unsupported(String),
}

/// Decide how to treat a document: content sniffing first, then the hint.
pub fn detect_format(document: &[u8], format: Option<&str>) -> DocumentFormat {
    if document.starts_with(PDF_MAGIC) {
        return DocumentFormat::Pdf;
    }
    let mime = format
        .map(|f| f.split(';').next().unwrap_or(f).trim().to_ascii_lowercase())
        .unwrap_or_default();
    match mime.as_str() {
        "application/pdf" => DocumentFormat::Pdf,
        m if m.starts_with("text/") => DocumentFormat::PlainText,
        "" | "application/octet-stream" if std::str::from_utf8(document).is_ok() => {
            DocumentFormat::PlainText
        }
        "" => DocumentFormat::Unsupported("application/octet-stream".into()),
        other => DocumentFormat::Unsupported(other.to_owned()),
    }
}

/// Default converter: PDF text extraction and plain-text pass-through.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl DocumentConverter for TextExtractor {
    #[instrument(skip(self, document), fields(bytes = document.len()))]
    fn convert(&self, document: &[u8], format: Option<&str>) -> Result<String> {
        let text = match detect_format(document, format) {
            DocumentFormat::Pdf => extract_pdf_text(document)?,
            DocumentFormat::PlainText => match String::from_utf8(document.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    debug!("text document is not UTF-8, decoding as CP437");
                    cp437::decode(document)
                }
            },
            DocumentFormat::Unsupported(mime) => {
                warn!(format = %mime, "no text conversion for document format");
                return Err(PrintdownError::Conversion(format!(
                    "cannot convert {mime} to text"
                )));
            }
        };
        info!(chars = text.chars().count(), "document converted to text");
        Ok(text)
    }
}

/// Extract the text of every page, in page order.
fn extract_pdf_text(document: &[u8]) -> Result<String> {
    let pdf = Document::load_mem(document)
        .map_err(|e| PrintdownError::Conversion(format!("failed to load PDF: {e}")))?;

    let pages: Vec<u32> = pdf.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(PrintdownError::Conversion("PDF has no pages".into()));
    }

    let text = pdf
        .extract_text(&pages)
        .map_err(|e| PrintdownError::Conversion(format!("PDF text extraction: {e}")))?;
    debug!(pages = pages.len(), "PDF text extracted");
    Ok(text)
}
