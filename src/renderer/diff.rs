//! Differential renderer.
//!
//! The DiffRenderer compares each frame to the previous one and only writes
//! the cells that changed. Two addressing modes:
//!
//! - **Inline**: the live region sits below the shell prompt. All movement
//!   is relative to where the cursor was parked after the previous pass
//!   (column 0 of the row just below the region), so the region survives
//!   scrollback.
//! - **Fullscreen**: the alternate screen buffer with absolute addressing.
//!
//! # Algorithm
//!
//! 1. No previous frame, or a width change: erase the painted region and
//!    paint every row.
//! 2. Otherwise, for each row present in both frames find the changed span
//!    (widened so it never splits a wide glyph) and rewrite only that span.
//! 3. Rows beyond the previous height are appended; rows beyond the new
//!    height are erased.
//! 4. The pass is wrapped in synchronized-update markers, but only when it
//!    produced output: an identical frame writes nothing at all.

use std::io::{self, Write};

use super::ansi;
use super::buffer::FrameBuffer;
use super::output::{row_to_ansi, OutputBuffer, StatefulCellRenderer};
use crate::types::Cell;

/// How the renderer addresses the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Inline,
    Fullscreen,
}

/// Differential renderer for the live region.
#[derive(Debug)]
pub struct DiffRenderer {
    mode: DiffMode,
    output: OutputBuffer,
    cell_renderer: StatefulCellRenderer,
    previous: Option<FrameBuffer>,
    /// Inline: cursor row relative to the top of the live region.
    cursor_row: u16,
    /// Fullscreen: static lines held back until the alternate screen is left.
    deferred_static: Vec<String>,
    entered: bool,
}

impl DiffRenderer {
    pub fn inline() -> Self {
        Self::new(DiffMode::Inline)
    }

    pub fn fullscreen() -> Self {
        Self::new(DiffMode::Fullscreen)
    }

    fn new(mode: DiffMode) -> Self {
        Self {
            mode,
            output: OutputBuffer::new(),
            cell_renderer: StatefulCellRenderer::new(),
            previous: None,
            cursor_row: 0,
            deferred_static: Vec::new(),
            entered: false,
        }
    }

    pub fn mode(&self) -> DiffMode {
        self.mode
    }

    /// The last frame written, if it is still trusted.
    pub fn previous(&self) -> Option<&FrameBuffer> {
        self.previous.as_ref()
    }

    /// Check if we have a previous frame to diff against.
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Forget the previous frame. The next pass erases what was painted and
    /// repaints fully.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Prepare the terminal: hide the cursor, and in fullscreen mode switch
    /// to the alternate screen.
    pub fn enter<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        if self.entered {
            return Ok(0);
        }
        self.entered = true;
        ansi::reset(&mut self.output)?;
        if self.mode == DiffMode::Fullscreen {
            ansi::enter_alt_screen(&mut self.output)?;
            ansi::clear_screen(&mut self.output)?;
        }
        ansi::cursor_hide(&mut self.output)?;
        self.invalidate();
        self.output.flush_to(out)
    }

    /// Restore the terminal: reset styles, show the cursor, leave the
    /// alternate screen and print any static lines held back meanwhile.
    pub fn leave<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        if !self.entered {
            return Ok(0);
        }
        self.entered = false;
        ansi::reset(&mut self.output)?;
        if self.mode == DiffMode::Fullscreen {
            ansi::exit_alt_screen(&mut self.output)?;
            for line in self.deferred_static.drain(..) {
                self.output.write_str(&line);
                ansi::reset(&mut self.output)?;
                self.output.write_str("\r\n");
            }
        }
        ansi::cursor_show(&mut self.output)?;
        self.output.flush_to(out)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Write the difference between `frame` and the previous frame.
    ///
    /// Returns the number of bytes written; zero when nothing changed.
    pub fn render<W: Write + ?Sized>(&mut self, frame: &FrameBuffer, out: &mut W) -> io::Result<usize> {
        self.output.clear();
        self.cell_renderer.reset();

        match self.previous.take() {
            Some(previous) if previous.width() == frame.width() => {
                self.paint_diff(&previous, frame)?;
            }
            _ => self.paint_full(frame)?,
        }
        self.previous = Some(frame.clone());
        self.flush_synced(out)
    }

    fn paint_full(&mut self, frame: &FrameBuffer) -> io::Result<()> {
        match self.mode {
            DiffMode::Inline => {
                self.move_to(0, 0)?;
                ansi::erase_down(&mut self.output)?;
                for row in frame.rows() {
                    self.output.write_str(&row_to_ansi(row));
                    self.output.write_str("\r\n");
                }
                self.cursor_row = frame.height();
            }
            DiffMode::Fullscreen => {
                ansi::clear_screen(&mut self.output)?;
                for (y, row) in frame.rows().enumerate() {
                    let line = row_to_ansi(row);
                    if !line.is_empty() {
                        ansi::cursor_to(&mut self.output, 0, y as u16)?;
                        self.output.write_str(&line);
                    }
                }
            }
        }
        Ok(())
    }

    fn paint_diff(&mut self, previous: &FrameBuffer, frame: &FrameBuffer) -> io::Result<()> {
        let common = previous.height().min(frame.height());
        let mut wrote = false;

        for y in 0..common {
            let (old, new) = (previous.row(y), frame.row(y));
            let Some((start, end)) = changed_span(old, new) else {
                continue;
            };
            self.move_to(y, start as u16)?;
            for cell in &new[start..end] {
                self.cell_renderer.render_cell(&mut self.output, cell)?;
            }
            wrote = true;
        }
        self.end_run()?;

        if frame.height() > previous.height() {
            self.move_to(previous.height(), 0)?;
            for y in previous.height()..frame.height() {
                match self.mode {
                    DiffMode::Inline => {
                        if y == previous.height() {
                            ansi::erase_down(&mut self.output)?;
                        }
                        self.output.write_str(&row_to_ansi(frame.row(y)));
                        self.output.write_str("\r\n");
                        self.cursor_row = y + 1;
                    }
                    DiffMode::Fullscreen => {
                        ansi::cursor_to(&mut self.output, 0, y)?;
                        ansi::erase_to_eol(&mut self.output)?;
                        self.output.write_str(&row_to_ansi(frame.row(y)));
                    }
                }
            }
        } else if frame.height() < previous.height() {
            match self.mode {
                DiffMode::Inline => {
                    self.move_to(frame.height(), 0)?;
                    ansi::erase_down(&mut self.output)?;
                }
                DiffMode::Fullscreen => {
                    for y in frame.height()..previous.height() {
                        ansi::cursor_to(&mut self.output, 0, y)?;
                        ansi::erase_to_eol(&mut self.output)?;
                    }
                }
            }
        } else if wrote {
            self.park(frame.height())?;
        }
        Ok(())
    }

    // =========================================================================
    // Out-of-band output
    // =========================================================================

    /// Emit static lines above the live region. The live region is erased
    /// first and repainted in full by the next pass.
    ///
    /// In fullscreen mode the lines are held back and printed after the
    /// alternate screen is left.
    pub fn write_static<W: Write + ?Sized>(&mut self, lines: &[String], out: &mut W) -> io::Result<usize> {
        if lines.is_empty() {
            return Ok(0);
        }
        if self.mode == DiffMode::Fullscreen {
            self.deferred_static.extend(lines.iter().cloned());
            return Ok(0);
        }

        self.output.clear();
        self.cell_renderer.reset();
        ansi::reset(&mut self.output)?;
        self.move_to(0, 0)?;
        ansi::erase_down(&mut self.output)?;
        for line in lines {
            self.output.write_str(line);
            ansi::reset(&mut self.output)?;
            self.output.write_str("\r\n");
        }
        self.cursor_row = 0;
        self.invalidate();
        self.flush_synced(out)
    }

    /// Print text that did not come from the tree (log lines and the like),
    /// keeping the live region intact below it.
    pub fn write_external<W: Write + ?Sized>(&mut self, text: &str, out: &mut W) -> io::Result<usize> {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if self.mode == DiffMode::Fullscreen {
            // Would land on the alternate screen and be overwritten.
            self.deferred_static.extend(lines);
            return Ok(0);
        }
        self.write_static(&lines, out)
    }

    /// Erase the live region.
    pub fn clear<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        self.output.clear();
        ansi::reset(&mut self.output)?;
        match self.mode {
            DiffMode::Inline => {
                self.move_to(0, 0)?;
                ansi::erase_down(&mut self.output)?;
            }
            DiffMode::Fullscreen => ansi::clear_screen(&mut self.output)?,
        }
        self.invalidate();
        self.output.flush_to(out)
    }

    // =========================================================================
    // Cursor bookkeeping
    // =========================================================================

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.end_run()?;
        match self.mode {
            DiffMode::Inline => {
                if row < self.cursor_row {
                    ansi::cursor_up(&mut self.output, self.cursor_row - row)?;
                } else {
                    ansi::cursor_down(&mut self.output, row - self.cursor_row)?;
                }
                ansi::cursor_column(&mut self.output, col)?;
                self.cursor_row = row;
            }
            DiffMode::Fullscreen => ansi::cursor_to(&mut self.output, col, row)?,
        }
        Ok(())
    }

    /// Inline mode leaves the cursor on the row below the live region.
    fn park(&mut self, height: u16) -> io::Result<()> {
        if self.mode == DiffMode::Inline {
            self.move_to(height, 0)?;
        }
        Ok(())
    }

    /// Drop any active style so moves and erases use the default colors.
    fn end_run(&mut self) -> io::Result<()> {
        if self.cell_renderer.is_styled() {
            ansi::reset(&mut self.output)?;
        }
        self.cell_renderer.reset();
        Ok(())
    }

    fn flush_synced<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        if self.output.is_empty() {
            return Ok(0);
        }
        let mut framed = OutputBuffer::with_capacity(self.output.len() + 16);
        ansi::begin_sync(&mut framed)?;
        framed.write_all(self.output.as_bytes())?;
        ansi::end_sync(&mut framed)?;
        self.output.clear();
        framed.flush_to(out)
    }
}

/// Columns `[start, end)` of `new` that must be rewritten to turn `old` into
/// `new`, widened so the span never starts or ends inside a wide glyph of
/// either row. `None` when the rows are identical.
fn changed_span(old: &[Cell], new: &[Cell]) -> Option<(usize, usize)> {
    let first = old.iter().zip(new).position(|(a, b)| a != b)?;
    let last = old.iter().zip(new).rposition(|(a, b)| a != b)?;

    let mut start = first;
    while start > 0
        && (old[start].glyph.is_continuation() || new[start].glyph.is_continuation())
    {
        start -= 1;
    }
    let mut end = last + 1;
    while end < new.len()
        && (old[end].glyph.is_continuation() || new[end].glyph.is_continuation())
    {
        end += 1;
    }
    Some((start, end))
}
