// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdown-document: text and image preparation for the thermal printer.
//
// Provides the inline markup compiler (marked-up text to device directives),
// the CP437 code page used on the wire to the printer, conversion of IPP
// documents to plain text, and 1-bit rasterisation of images.

pub mod convert;
pub mod cp437;
pub mod markup;
pub mod raster;

// Re-export the primary items so callers can use `printdown_document::compile` etc.
pub use convert::{DocumentConverter, TextExtractor};
pub use markup::{MarkupCompiler, compile};
pub use raster::{Raster, rasterize};
