// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inline markup compiler -- turns marked-up text into device directives.
//
// # Syntax
//
// Rules are tried in this order at every scan position; the first match wins.
//
//   >>>              paper cut (own line, 3+ delimiter characters)
//   **text**         bold
//   __text__         underline
//   ~~text~~         inverted (white on black)
//   # text           header, level = number of '#'
//   <L> <C> <R>      alignment, closed by </L> </C> </R>
//   <2H> <2W>        double height / double width
//   <WxH>            custom size, W and H in 1..=9, closed by </WxH>
//
// Anything else is literal text.  An opening marker without its closing
// counterpart is literal too: the scan emits its first character and moves
// on by one character.

use tracing::trace;

use printdown_core::directive::{Alignment, Directive, StyleKind};

/// Default paper-cut delimiter character.
pub const DEFAULT_CUT_DELIMITER: char = '>';

/// Minimum run of delimiter characters that forms a paper cut.
const MIN_CUT_RUN: usize = 3;

/// Paired emphasis markers.
const PAIRED_MARKERS: [(&str, StyleKind); 3] = [
    ("**", StyleKind::Bold),
    ("__", StyleKind::Underline),
    ("~~", StyleKind::Invert),
];

/// Alignment tags and their closing counterparts.
const ALIGN_TAGS: [(&str, &str, Alignment); 3] = [
    ("<L>", "</L>", Alignment::Left),
    ("<C>", "</C>", Alignment::Center),
    ("<R>", "</R>", Alignment::Right),
];

/// Fixed double-size tags.
const SIZE_TAGS: [(&str, &str, StyleKind); 2] = [
    ("<2H>", "</2H>", StyleKind::DoubleHeight),
    ("<2W>", "</2W>", StyleKind::DoubleWidth),
];

/// Compile `text` using the default paper-cut delimiter.
pub fn compile(text: &str) -> Vec<Directive> {
    MarkupCompiler::default().compile(text)
}

/// Single-pass markup compiler.
///
/// Pure and deterministic; every iteration of the scan consumes at least one
/// character, so compilation always terminates.
#[derive(Debug, Clone, Copy)]
pub struct MarkupCompiler {
    cut_delimiter: char,
}

impl Default for MarkupCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_CUT_DELIMITER)
    }
}

impl MarkupCompiler {
    pub fn new(cut_delimiter: char) -> Self {
        Self { cut_delimiter }
    }

    pub fn cut_delimiter(&self) -> char {
        self.cut_delimiter
    }

    /// Compile marked-up text into an ordered directive sequence.
    pub fn compile(&self, text: &str) -> Vec<Directive> {
        let mut out = Emitter::default();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let at_line_start = pos == 0 || text.as_bytes()[pos - 1] == b'\n';

            if at_line_start {
                if let Some(consumed) = self.match_paper_cut(rest) {
                    out.push(Directive::PaperCut);
                    pos += consumed;
                    continue;
                }
            }

            if let Some((directive, consumed)) = match_paired(rest) {
                out.push(directive);
                pos += consumed;
                continue;
            }

            if let Some(header) = match_header(rest) {
                if let Some(directive) = header.directive {
                    out.push(directive);
                    if header.newline_follows {
                        out.push_literal("\n");
                    }
                }
                pos += header.consumed;
                continue;
            }

            if let Some((directive, consumed)) = match_tagged(rest) {
                out.push(directive);
                pos += consumed;
                continue;
            }

            if let Some((directive, consumed)) = match_custom_size(rest) {
                out.push(directive);
                pos += consumed;
                continue;
            }

            // Literal: exactly one character.
            let Some(ch) = rest.chars().next() else {
                break;
            };
            let width = ch.len_utf8();
            out.push_literal(&rest[..width]);
            pos += width;
        }

        let directives = out.finish();
        trace!(input_len = text.len(), directives = directives.len(), "markup compiled");
        directives
    }

    /// A whole line of at least three delimiter characters.  Returns the
    /// number of bytes consumed, including the terminating newline.
    fn match_paper_cut(&self, rest: &str) -> Option<usize> {
        let newline = rest.find('\n');
        let line = newline.map_or(rest, |i| &rest[..i]);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut run = 0;
        for ch in line.chars() {
            if ch != self.cut_delimiter {
                return None;
            }
            run += 1;
        }
        if run < MIN_CUT_RUN {
            return None;
        }

        Some(newline.map_or(rest.len(), |i| i + 1))
    }
}

/// `**bold**`, `__underline__`, `~~invert~~`.
fn match_paired(rest: &str) -> Option<(Directive, usize)> {
    for (marker, kind) in PAIRED_MARKERS {
        if let Some(body) = rest.strip_prefix(marker) {
            let end = body.find(marker)?;
            let consumed = marker.len() * 2 + end;
            return Some((Directive::Style(kind, body[..end].to_owned()), consumed));
        }
    }
    None
}

/// Outcome of scanning a `#` run.
struct HeaderMatch {
    /// `None` when the header text was empty after trimming.
    directive: Option<Directive>,
    /// The header line was terminated by a newline (which was consumed).
    newline_follows: bool,
    consumed: usize,
}

/// `#`-prefixed header running to the end of the line.
fn match_header(rest: &str) -> Option<HeaderMatch> {
    let level = rest.bytes().take_while(|b| *b == b'#').count();
    if level == 0 {
        return None;
    }

    let after = &rest[level..];
    let newline = after.find('\n');
    let line = newline.map_or(after, |i| &after[..i]);
    let body = line.strip_prefix(' ').unwrap_or(line).trim();

    let directive = (!body.is_empty()).then(|| {
        let level = u8::try_from(level).unwrap_or(u8::MAX);
        Directive::Header(level, body.to_owned())
    });

    Some(HeaderMatch {
        directive,
        newline_follows: newline.is_some(),
        consumed: level + newline.map_or(after.len(), |i| i + 1),
    })
}

/// Alignment and fixed double-size tags.
fn match_tagged(rest: &str) -> Option<(Directive, usize)> {
    for (open, close, alignment) in ALIGN_TAGS {
        if let Some(body) = rest.strip_prefix(open) {
            let end = body.find(close)?;
            let directive = Directive::Align(alignment, body[..end].to_owned());
            return Some((directive, open.len() + end + close.len()));
        }
    }
    for (open, close, kind) in SIZE_TAGS {
        if let Some(body) = rest.strip_prefix(open) {
            let end = body.find(close)?;
            let directive = Directive::Style(kind, body[..end].to_owned());
            return Some((directive, open.len() + end + close.len()));
        }
    }
    None
}

/// `<WxH>text</WxH>` with single-digit multipliers.
fn match_custom_size(rest: &str) -> Option<(Directive, usize)> {
    let bytes = rest.as_bytes();
    if bytes.len() < 5 || bytes[0] != b'<' || bytes[2] != b'x' || bytes[4] != b'>' {
        return None;
    }
    let width = size_digit(bytes[1])?;
    let height = size_digit(bytes[3])?;

    let close = format!("</{width}x{height}>");
    let body = &rest[5..];
    let end = body.find(&close)?;

    let directive = Directive::CustomSize {
        width,
        height,
        text: body[..end].to_owned(),
    };
    Some((directive, 5 + end + close.len()))
}

fn size_digit(byte: u8) -> Option<u8> {
    matches!(byte, b'1'..=b'9').then(|| byte - b'0')
}

/// Collects directives, coalescing adjacent literal text into one `Text`.
#[derive(Default)]
struct Emitter {
    directives: Vec<Directive>,
    literal: String,
}

impl Emitter {
    fn push_literal(&mut self, text: &str) {
        self.literal.push_str(text);
    }

    fn push(&mut self, directive: Directive) {
        self.flush_literal();
        self.directives.push(directive);
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.directives.push(Directive::Text(text));
        }
    }

    fn finish(mut self) -> Vec<Directive> {
        self.flush_literal();
        self.directives
    }
}
