//! Terminal renderer - the "blind" output layer.
//!
//! The renderer knows only about cells. It doesn't understand nodes or
//! layout. It takes a filled FrameBuffer and writes ANSI escape sequences to
//! whatever `Write` it is handed.
//!
//! # Architecture
//!
//! ```text
//!   NodeTree ── layout ── compose ──► Frame { live, static_lines }
//!                                          │
//!                        ┌─────────────────┴──────────────┐
//!                        ▼                                ▼
//!                 ┌─────────────┐                  ┌─────────────┐
//!                 │DiffRenderer │ inline/fullscreen│PlainRenderer│ non-TTY
//!                 └─────────────┘                  └─────────────┘
//!                        │                                │
//!                        └────────────► Backend ◄─────────┘
//! ```
//!
//! # Key Optimizations
//!
//! 1. **Differential rendering**: Only output cells that changed
//! 2. **Stateful rendering**: Track colors/attrs to skip redundant codes
//! 3. **Output batching**: Single write per pass
//! 4. **Synchronized output**: Flicker-free with terminal sync protocol
//!
//! # Example
//!
//! ```
//! use weft::renderer::{DiffRenderer, FrameBuffer};
//! use weft::types::CellStyle;
//!
//! let mut buffer = FrameBuffer::new(20, 1);
//! let clip = buffer.bounds();
//! buffer.set_glyph(0, 0, "A", 1, CellStyle::default(), &clip);
//!
//! let mut renderer = DiffRenderer::inline();
//! let mut out = Vec::new();
//! assert!(renderer.render(&buffer, &mut out).unwrap() > 0);
//!
//! // An unchanged frame writes nothing.
//! assert_eq!(renderer.render(&buffer, &mut out).unwrap(), 0);
//! ```

use std::io::{self, Write};

pub mod ansi;
pub mod buffer;
pub mod diff;
pub mod output;
pub mod plain;
pub mod sgr;

pub use crate::types::ClipRect;
pub use buffer::FrameBuffer;
pub use diff::{DiffMode, DiffRenderer};
pub use output::{row_to_ansi, OutputBuffer, StatefulCellRenderer};
pub use plain::PlainRenderer;
pub use sgr::{styled_graphemes, SgrState, StyledGrapheme};

use crate::types::RenderMode;

/// The renderer an instance drives, chosen by [`RenderMode`].
#[derive(Debug)]
pub enum Renderer {
    Diff(DiffRenderer),
    Plain(PlainRenderer),
}

impl Renderer {
    pub fn for_mode(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Inline => Self::Diff(DiffRenderer::inline()),
            RenderMode::Fullscreen => Self::Diff(DiffRenderer::fullscreen()),
            RenderMode::Plain => Self::Plain(PlainRenderer::new()),
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Diff(_))
    }

    pub fn enter<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.enter(out),
            Self::Plain(_) => Ok(0),
        }
    }

    pub fn render<W: Write + ?Sized>(&mut self, frame: &FrameBuffer, out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.render(frame, out),
            Self::Plain(plain) => {
                plain.render(frame);
                Ok(0)
            }
        }
    }

    pub fn write_static<W: Write + ?Sized>(&mut self, lines: &[String], out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.write_static(lines, out),
            Self::Plain(plain) => plain.write_static(lines, out),
        }
    }

    pub fn write_external<W: Write + ?Sized>(&mut self, text: &str, out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.write_external(text, out),
            Self::Plain(plain) => plain.write_external(text, out),
        }
    }

    pub fn invalidate(&mut self) {
        if let Self::Diff(diff) = self {
            diff.invalidate();
        }
    }

    /// Erase the live region (interactive modes only).
    pub fn clear<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.clear(out),
            Self::Plain(_) => Ok(0),
        }
    }

    /// Hand the terminal back: leave the alternate screen and show the
    /// cursor, or print the final frame in plain mode.
    pub fn leave<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        match self {
            Self::Diff(diff) => diff.leave(out),
            Self::Plain(plain) => plain.finish(out),
        }
    }
}
