// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device-control directives produced by the markup compiler and applied by
// the job executor.

use serde::{Deserialize, Serialize};

/// Text styles that wrap a run of text and are switched off afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleKind {
    Bold,
    Underline,
    /// White on black.
    Invert,
    DoubleHeight,
    DoubleWidth,
}

/// Horizontal justification of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One device-control instruction.
///
/// A job's directives are applied strictly in order; the document reads
/// top-to-bottom, directive by directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Unformatted text, printed as-is (newlines included).
    Text(String),
    Style(StyleKind, String),
    /// Header text; level 1 is the largest.
    Header(u8, String),
    Align(Alignment, String),
    /// Explicit character size multipliers, each in `1..=9`.
    CustomSize { width: u8, height: u8, text: String },
    PaperCut,
}

impl Directive {
    /// The printable text carried by this directive, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text)
            | Self::Style(_, text)
            | Self::Header(_, text)
            | Self::Align(_, text)
            | Self::CustomSize { text, .. } => Some(text),
            Self::PaperCut => None,
        }
    }
}

/// Concatenate the text content of a directive sequence.
pub fn concat_text(directives: &[Directive]) -> String {
    directives.iter().filter_map(Directive::text).collect()
}
