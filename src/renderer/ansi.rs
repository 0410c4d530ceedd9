//! ANSI escape sequences for terminal control.
//!
//! Everything the renderers emit goes through these helpers:
//! - Cursor movement (absolute and relative) and visibility
//! - Line and screen erasing
//! - Colors (ANSI 16, 256, and TrueColor) and text attributes
//! - Alternate screen, bracketed paste, synchronized output

use std::io::{Result, Write};

use crate::types::{Attr, Rgba};

// =============================================================================
// Cursor Movement
// =============================================================================

/// Move cursor to absolute position (0-indexed in, 1-indexed on the wire).
#[inline]
pub fn cursor_to<W: Write>(w: &mut W, col: u16, row: u16) -> Result<()> {
    write!(w, "\x1b[{};{}H", row as u32 + 1, col as u32 + 1)
}

#[inline]
pub fn cursor_up<W: Write>(w: &mut W, n: u16) -> Result<()> {
    if n > 0 {
        write!(w, "\x1b[{n}A")
    } else {
        Ok(())
    }
}

#[inline]
pub fn cursor_down<W: Write>(w: &mut W, n: u16) -> Result<()> {
    if n > 0 {
        write!(w, "\x1b[{n}B")
    } else {
        Ok(())
    }
}

/// Move to a column of the current row. Column zero is a bare carriage
/// return.
#[inline]
pub fn cursor_column<W: Write>(w: &mut W, col: u16) -> Result<()> {
    if col == 0 {
        w.write_all(b"\r")
    } else {
        write!(w, "\x1b[{}G", col as u32 + 1)
    }
}

#[inline]
pub fn cursor_hide<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?25h")
}

// =============================================================================
// Screen Control
// =============================================================================

#[inline]
pub fn erase_to_eol<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[K")
}

/// Clear from cursor to end of screen.
#[inline]
pub fn erase_down<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[J")
}

/// Clear entire screen and home the cursor.
#[inline]
pub fn clear_screen<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[2J\x1b[H")
}

/// Enter alternate screen buffer (fullscreen mode).
#[inline]
pub fn enter_alt_screen<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// =============================================================================
// Synchronized Output (Flicker Prevention)
// =============================================================================

/// Begin synchronized output (terminal buffers until end_sync).
#[inline]
pub fn begin_sync<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// =============================================================================
// Colors and Attributes
// =============================================================================

/// Reset all attributes and colors.
#[inline]
pub fn reset<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[0m")
}

#[inline]
pub fn fg<W: Write>(w: &mut W, color: Rgba) -> Result<()> {
    write!(w, "\x1b[{}m", color.fg_params())
}

#[inline]
pub fn bg<W: Write>(w: &mut W, color: Rgba) -> Result<()> {
    write!(w, "\x1b[{}m", color.bg_params())
}

/// Set text attributes from bitflags. Nothing is written for `Attr::NONE`.
pub fn attrs<W: Write>(w: &mut W, attr: Attr) -> Result<()> {
    const CODES: [(Attr, u8); 8] = [
        (Attr::BOLD, 1),
        (Attr::DIM, 2),
        (Attr::ITALIC, 3),
        (Attr::UNDERLINE, 4),
        (Attr::BLINK, 5),
        (Attr::INVERSE, 7),
        (Attr::HIDDEN, 8),
        (Attr::STRIKETHROUGH, 9),
    ];

    if attr.is_empty() {
        return Ok(());
    }
    let params: Vec<String> = CODES
        .iter()
        .filter(|(flag, _)| attr.contains(*flag))
        .map(|(_, code)| code.to_string())
        .collect();
    write!(w, "\x1b[{}m", params.join(";"))
}

// =============================================================================
// Input Protocols
// =============================================================================

#[inline]
pub fn enable_bracketed_paste<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?2004h")
}

#[inline]
pub fn disable_bracketed_paste<W: Write>(w: &mut W) -> Result<()> {
    w.write_all(b"\x1b[?2004l")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_cursor_to() {
        assert_eq!(to_string(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(to_string(|w| cursor_to(w, 5, 10)), "\x1b[11;6H");
    }

    #[test]
    fn test_cursor_movement() {
        assert_eq!(to_string(|w| cursor_up(w, 5)), "\x1b[5A");
        assert_eq!(to_string(|w| cursor_down(w, 3)), "\x1b[3B");
        assert_eq!(to_string(|w| cursor_up(w, 0)), "");
        assert_eq!(to_string(|w| cursor_column(w, 0)), "\r");
        assert_eq!(to_string(|w| cursor_column(w, 4)), "\x1b[5G");
    }

    #[test]
    fn test_screen_control() {
        assert_eq!(to_string(erase_down), "\x1b[J");
        assert_eq!(to_string(enter_alt_screen), "\x1b[?1049h");
        assert_eq!(to_string(exit_alt_screen), "\x1b[?1049l");
        assert_eq!(to_string(begin_sync), "\x1b[?2026h");
        assert_eq!(to_string(end_sync), "\x1b[?2026l");
    }

    #[test]
    fn test_colors() {
        assert_eq!(to_string(|w| fg(w, Rgba::TERMINAL_DEFAULT)), "\x1b[39m");
        assert_eq!(to_string(|w| fg(w, Rgba::RED)), "\x1b[31m");
        assert_eq!(to_string(|w| fg(w, Rgba::ansi(15))), "\x1b[97m");
        assert_eq!(to_string(|w| fg(w, Rgba::ansi(196))), "\x1b[38;5;196m");
        assert_eq!(to_string(|w| bg(w, Rgba::ansi(9))), "\x1b[101m");
        assert_eq!(
            to_string(|w| bg(w, Rgba::rgb(0, 128, 255))),
            "\x1b[48;2;0;128;255m"
        );
    }

    #[test]
    fn test_attrs() {
        assert_eq!(to_string(|w| attrs(w, Attr::NONE)), "");
        assert_eq!(to_string(|w| attrs(w, Attr::BOLD | Attr::UNDERLINE)), "\x1b[1;4m");
        assert_eq!(
            to_string(|w| attrs(w, Attr::BOLD | Attr::ITALIC | Attr::STRIKETHROUGH)),
            "\x1b[1;3;9m"
        );
    }
}
