// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code page 437 -- the 8-bit character set thermal printers default to.
//
// Raw text jobs arrive as CP437 bytes and are decoded to Unicode before
// compilation; the ESC/POS driver encodes text back to CP437 on the way out.
// The lower half (0x00-0x7F) is plain ASCII in both directions.

use tracing::warn;

/// Unicode code points for CP437 bytes 0x80-0xFF.
const UPPER_HALF: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{00A0}',
];

/// Byte substituted for characters CP437 cannot represent.
const REPLACEMENT: u8 = b'?';

/// Decode CP437 bytes into a Unicode string.  Every byte has a mapping, so
/// decoding never fails.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| decode_byte(b)).collect()
}

fn decode_byte(byte: u8) -> char {
    if byte < 0x80 {
        char::from(byte)
    } else {
        UPPER_HALF[usize::from(byte - 0x80)]
    }
}

/// Encode a Unicode string as CP437.  Unmapped characters become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut unmapped = 0usize;
    for ch in text.chars() {
        match encode_char(ch) {
            Some(byte) => out.push(byte),
            None => {
                unmapped += 1;
                out.push(REPLACEMENT);
            }
        }
    }
    if unmapped > 0 {
        warn!(unmapped, "characters outside CP437 replaced with '?'");
    }
    out
}

fn encode_char(ch: char) -> Option<u8> {
    if ch.is_ascii() {
        return Some(ch as u8);
    }
    UPPER_HALF
        .iter()
        .position(|&c| c == ch)
        .and_then(|i| u8::try_from(i + 0x80).ok())
}
