//! Output buffering and stateful cell rendering.
//!
//! These components keep terminal output small by:
//! - Batching a whole pass into a single write
//! - Tracking terminal style state to avoid redundant escape codes

use std::io::{self, Write};

use super::ansi;
use crate::types::{Cell, CellStyle};

// =============================================================================
// OutputBuffer
// =============================================================================

/// A buffer that accumulates output for batch writing.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_capacity(16384)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear the buffer without deallocating.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Write everything to `writer` in one call and flush it. Writes nothing
    /// (and does not flush) when the buffer is empty.
    pub fn flush_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.data.is_empty() {
            return Ok(0);
        }
        let written = self.data.len();
        writer.write_all(&self.data)?;
        writer.flush()?;
        self.data.clear();
        Ok(written)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The accumulated data as a string (lossy).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// StatefulCellRenderer
// =============================================================================

/// Renders cells while tracking terminal style state to minimize output.
///
/// When rendering a cell it only emits escape codes for the parts of the
/// style that changed since the previous cell. The tracked state starts at
/// the terminal defaults, so callers must only use a fresh (or [`reset`])
/// renderer right after an SGR reset. Cursor movement is the caller's job.
///
/// [`reset`]: StatefulCellRenderer::reset
#[derive(Debug, Default)]
pub struct StatefulCellRenderer {
    last: CellStyle,
}

impl StatefulCellRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The terminal is back at its default style.
    pub fn reset(&mut self) {
        self.last = CellStyle::default();
    }

    /// Whether any style is active on the terminal (a reset is needed
    /// before handing the cursor back).
    pub fn is_styled(&self) -> bool {
        self.last != CellStyle::default()
    }

    /// Emit style changes for `cell`, then its glyph. Continuation cells
    /// emit nothing.
    pub fn render_cell<W: Write>(&mut self, out: &mut W, cell: &Cell) -> io::Result<()> {
        if cell.glyph.is_continuation() {
            return Ok(());
        }
        self.apply_style(out, cell.style())?;
        let mut text = String::new();
        cell.glyph.push_to(&mut text);
        out.write_all(text.as_bytes())
    }

    fn apply_style<W: Write>(&mut self, out: &mut W, style: CellStyle) -> io::Result<()> {
        if self.last == style {
            return Ok(());
        }
        if self.last.attrs != style.attrs {
            if style.attrs.contains(self.last.attrs) {
                ansi::attrs(out, style.attrs - self.last.attrs)?;
            } else {
                ansi::reset(out)?;
                ansi::attrs(out, style.attrs)?;
                self.last = CellStyle::default();
            }
        }
        if self.last.fg != style.fg {
            ansi::fg(out, style.fg)?;
        }
        if self.last.bg != style.bg {
            ansi::bg(out, style.bg)?;
        }
        self.last = style;
        Ok(())
    }
}

/// Encode a row of cells as a self-contained ANSI string: trailing blank
/// cells are dropped and any style is reset at the end.
pub fn row_to_ansi(cells: &[Cell]) -> String {
    let end = cells
        .iter()
        .rposition(|c| !c.is_blank() && !c.glyph.is_continuation())
        .map_or(0, |i| {
            if cells.get(i + 1).is_some_and(|c| c.glyph.is_continuation()) {
                i + 2
            } else {
                i + 1
            }
        });

    let mut out = OutputBuffer::with_capacity(end * 2);
    let mut renderer = StatefulCellRenderer::new();
    for cell in &cells[..end] {
        renderer.render_cell(&mut out, cell).ok();
    }
    if renderer.is_styled() {
        ansi::reset(&mut out).ok();
    }
    out.as_str().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attr, Glyph, Rgba};

    fn cell(c: char, fg: Rgba, attrs: Attr) -> Cell {
        Cell {
            glyph: Glyph::Char(c),
            fg,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs,
        }
    }

    fn render(cells: &[Cell]) -> String {
        let mut out = OutputBuffer::new();
        let mut renderer = StatefulCellRenderer::new();
        for c in cells {
            renderer.render_cell(&mut out, c).unwrap();
        }
        out.as_str().into_owned()
    }

    #[test]
    fn test_output_buffer_flush() {
        let mut buf = OutputBuffer::new();
        buf.write_str("hello");
        let mut sink = Vec::new();
        assert_eq!(buf.flush_to(&mut sink).unwrap(), 5);
        assert!(buf.is_empty());
        assert_eq!(buf.flush_to(&mut sink).unwrap(), 0);
        assert_eq!(sink, b"hello");
    }

    #[test]
    fn test_same_style_emitted_once() {
        let red = cell('a', Rgba::RED, Attr::NONE);
        let out = render(&[red.clone(), red]);
        assert_eq!(out, "\x1b[31maa");
    }

    #[test]
    fn test_adding_attr_does_not_reset() {
        let out = render(&[
            cell('a', Rgba::RED, Attr::NONE),
            cell('b', Rgba::RED, Attr::BOLD),
        ]);
        assert!(out.ends_with("a\x1b[1mb"), "{out:?}");
    }

    #[test]
    fn test_removing_attr_resets() {
        let out = render(&[
            cell('a', Rgba::TERMINAL_DEFAULT, Attr::BOLD),
            cell('b', Rgba::TERMINAL_DEFAULT, Attr::NONE),
        ]);
        assert!(out.ends_with("a\x1b[0mb"), "{out:?}");
    }

    #[test]
    fn test_continuation_cell_skipped() {
        let mut renderer = StatefulCellRenderer::new();
        let mut out = OutputBuffer::new();
        let continuation = Cell {
            glyph: Glyph::Continuation,
            ..Cell::default()
        };
        renderer.render_cell(&mut out, &continuation).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_row_to_ansi_trims_and_resets() {
        let mut row = vec![Cell::default(); 6];
        row[0] = cell('h', Rgba::GREEN, Attr::NONE);
        row[1] = cell('i', Rgba::GREEN, Attr::NONE);
        assert_eq!(row_to_ansi(&row), "\x1b[32mhi\x1b[0m");
        assert_eq!(row_to_ansi(&vec![Cell::default(); 3]), "");
    }

    #[test]
    fn test_row_to_ansi_plain_text_has_no_trailing_reset() {
        let row = [cell('o', Rgba::TERMINAL_DEFAULT, Attr::NONE), Cell::default()];
        assert_eq!(row_to_ansi(&row), "o");
    }
}
