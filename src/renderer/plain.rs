//! Non-interactive output.
//!
//! When stdout is not a terminal (pipes, CI logs) there is no cursor to move
//! and nothing to update in place. The plain renderer only remembers the
//! latest frame, prints static content as soon as it appears and prints the
//! final frame once at unmount. No escape sequences are ever written.

use std::io::{self, Write};

use super::buffer::FrameBuffer;
use crate::layout::text_measure::strip_ansi;

#[derive(Debug, Default)]
pub struct PlainRenderer {
    last: Option<Vec<String>>,
    finished: bool,
}

impl PlainRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `frame` as the one to print at the end. Writes nothing.
    pub fn render(&mut self, frame: &FrameBuffer) {
        let mut lines = frame.to_plain_lines();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        self.last = Some(lines);
    }

    /// The latest frame as plain lines.
    pub fn last_lines(&self) -> Option<&[String]> {
        self.last.as_deref()
    }

    pub fn write_static<W: Write + ?Sized>(&mut self, lines: &[String], out: &mut W) -> io::Result<usize> {
        let mut text = String::new();
        for line in lines {
            text.push_str(strip_ansi(line).trim_end());
            text.push('\n');
        }
        write_all(out, &text)
    }

    pub fn write_external<W: Write + ?Sized>(&mut self, text: &str, out: &mut W) -> io::Result<usize> {
        let mut text = strip_ansi(text).into_owned();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        write_all(out, &text)
    }

    /// Print the final frame. Only the first call writes.
    pub fn finish<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<usize> {
        if std::mem::replace(&mut self.finished, true) {
            return Ok(0);
        }
        let Some(lines) = self.last.take() else {
            return Ok(0);
        };
        if lines.is_empty() {
            return Ok(0);
        }
        let mut text = lines.join("\n");
        text.push('\n');
        write_all(out, &text)
    }
}

fn write_all<W: Write + ?Sized>(out: &mut W, text: &str) -> io::Result<usize> {
    if text.is_empty() {
        return Ok(0);
    }
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellStyle;

    fn frame(text: &str) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(10, 3);
        let clip = buffer.bounds();
        for (x, c) in text.chars().enumerate() {
            let mut tmp = [0u8; 4];
            buffer.set_glyph(x as i32, 0, c.encode_utf8(&mut tmp), 1, CellStyle::default(), &clip);
        }
        buffer
    }

    #[test]
    fn test_only_final_frame_is_printed() {
        let mut renderer = PlainRenderer::new();
        renderer.render(&frame("one"));
        renderer.render(&frame("two"));

        let mut out = Vec::new();
        renderer.finish(&mut out).unwrap();
        assert_eq!(out, b"two\n");

        out.clear();
        assert_eq!(renderer.finish(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_static_is_stripped_and_immediate() {
        let mut renderer = PlainRenderer::new();
        let mut out = Vec::new();
        renderer
            .write_static(&["\x1b[32mok\x1b[0m  ".to_string()], &mut out)
            .unwrap();
        assert_eq!(out, b"ok\n");
    }

    #[test]
    fn test_external_gets_newline() {
        let mut renderer = PlainRenderer::new();
        let mut out = Vec::new();
        renderer.write_external("note", &mut out).unwrap();
        renderer.write_external("done\n", &mut out).unwrap();
        assert_eq!(out, b"note\ndone\n");
    }
}
