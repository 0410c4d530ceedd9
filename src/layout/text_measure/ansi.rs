//! ANSI escape sequence handling for measurement and layout.
//!
//! Escape sequences occupy zero columns. Recognised forms:
//! - CSI: `ESC [` ... final byte (0x40-0x7E)
//! - OSC: `ESC ]` ... BEL or ST (`ESC \`)
//! - DCS/PM/APC: `ESC P` / `ESC ^` / `ESC _` ... ST
//! - two-character sequences: `ESC` + one ASCII byte

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

use super::width::grapheme_width;

/// Strip escape sequences. Borrows when the input contains none.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.as_bytes().contains(&0x1B) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for piece in Pieces::new(s) {
        if let Piece::Text(text) = piece {
            result.push_str(text);
        }
    }
    Cow::Owned(result)
}

/// Concatenation of every escape sequence in `s`, in order.
pub fn escapes_only(s: &str) -> String {
    Pieces::new(s)
        .filter_map(|piece| match piece {
            Piece::Escape(seq) => Some(seq),
            Piece::Text(_) => None,
        })
        .collect()
}

/// Iterate the individual escape sequences in a run of escapes.
pub(crate) fn escape_sequences(s: &str) -> impl Iterator<Item = &str> {
    Pieces::new(s).filter_map(|piece| match piece {
        Piece::Escape(seq) => Some(seq),
        Piece::Text(_) => None,
    })
}

// =============================================================================
// Pieces: alternating text and escape sequences
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Escape(&'a str),
}

struct Pieces<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Pieces<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        let bytes = self.s.as_bytes();
        let start = self.pos;
        if start >= bytes.len() {
            return None;
        }

        if bytes[start] == 0x1B {
            self.pos = skip_escape_sequence(bytes, start);
            return Some(Piece::Escape(&self.s[start..self.pos]));
        }

        // ESC is a single ASCII byte, so splitting on it never cuts a
        // UTF-8 sequence.
        let end = bytes[start..]
            .iter()
            .position(|&b| b == 0x1B)
            .map_or(bytes.len(), |offset| start + offset);
        self.pos = end;
        Some(Piece::Text(&self.s[start..end]))
    }
}

/// Byte index after the sequence starting at `pos` (an ESC byte).
fn skip_escape_sequence(bytes: &[u8], pos: usize) -> usize {
    let next = pos + 1;
    if next >= bytes.len() {
        return bytes.len();
    }

    match bytes[next] {
        b'[' => skip_csi(bytes, next + 1),
        b']' | b'P' | b'^' | b'_' => skip_string_terminated(bytes, next + 1),
        0x20..=0x7E => next + 1,
        // A non-ASCII byte is never part of the sequence; leave it as text.
        _ => next,
    }
}

/// `pos` is the byte after `[`. Parameter and intermediate bytes run up to a
/// final byte in 0x40-0x7E.
fn skip_csi(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        let b = bytes[i];
        if (0x40..=0x7E).contains(&b) {
            return i + 1;
        }
        if !(0x20..=0x7E).contains(&b) {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// OSC, DCS, PM and APC end with BEL or ST.
fn skip_string_terminated(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            0x07 => return i + 1,
            0x1B if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
            _ => i += 1,
        }
    }
    bytes.len()
}

// =============================================================================
// Styled units
// =============================================================================

/// One visible grapheme together with the escape sequences right before it.
///
/// Wrapping and truncation operate on units so that a cut can drop a
/// grapheme while keeping the styling that precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unit<'a> {
    pub prefix: &'a str,
    pub grapheme: &'a str,
    pub width: usize,
}

impl<'a> Unit<'a> {
    /// The same position with the grapheme removed.
    pub fn escapes_only(self) -> Unit<'a> {
        Unit {
            prefix: self.prefix,
            grapheme: "",
            width: 0,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        !self.grapheme.is_empty() && self.grapheme.chars().all(char::is_whitespace)
    }

    pub fn push_to(&self, out: &mut String) {
        out.push_str(self.prefix);
        out.push_str(self.grapheme);
    }
}

/// Split `s` into units plus the escapes that trail the last grapheme.
pub(crate) fn split_units(s: &str) -> (Vec<Unit<'_>>, &str) {
    let mut units = Vec::new();
    let mut pending: Option<(usize, usize)> = None;
    let base = s.as_ptr() as usize;

    for piece in Pieces::new(s) {
        match piece {
            Piece::Escape(seq) => {
                let start = seq.as_ptr() as usize - base;
                let end = start + seq.len();
                pending = Some(pending.map_or((start, end), |(first, _)| (first, end)));
            }
            Piece::Text(text) => {
                for (i, grapheme) in text.graphemes(true).enumerate() {
                    let prefix = match (i, pending.take()) {
                        (0, Some((start, end))) => &s[start..end],
                        _ => "",
                    };
                    units.push(Unit {
                        prefix,
                        grapheme,
                        width: grapheme_width(grapheme),
                    });
                }
            }
        }
    }

    let trailing = pending.map_or("", |(start, end)| &s[start..end]);
    (units, trailing)
}
