//! SGR interpretation for styled text.
//!
//! Text content may carry `ESC [ … m` sequences. The compositor walks a line
//! grapheme by grapheme and applies the sequences in front of each grapheme
//! to a running [`CellStyle`]. A reset returns to the node's inherited base
//! style rather than the terminal defaults, and default fg/bg codes do the
//! same for their channel. Non-SGR sequences are ignored.

use crate::layout::text_measure::{escape_sequences, split_units};
use crate::types::{Attr, CellStyle, Rgba};

/// Running style while interpreting one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SgrState {
    base: CellStyle,
    current: CellStyle,
}

impl SgrState {
    pub fn new(base: CellStyle) -> Self {
        Self {
            base,
            current: base,
        }
    }

    #[inline]
    pub fn current(&self) -> CellStyle {
        self.current
    }

    /// Apply one escape sequence. Anything that is not a CSI SGR is ignored.
    pub fn apply(&mut self, seq: &str) {
        let Some(params) = seq
            .strip_prefix("\x1b[")
            .and_then(|rest| rest.strip_suffix('m'))
        else {
            return;
        };
        if !params.bytes().all(|b| b.is_ascii_digit() || b == b';' || b == b':') {
            return;
        }

        let codes: Vec<u32> = params
            .split([';', ':'])
            .map(|p| p.parse().unwrap_or(0))
            .collect();
        let mut i = 0;
        while i < codes.len() {
            let code = codes[i];
            let style = &mut self.current;
            match code {
                0 => *style = self.base,
                1 => style.attrs.insert(Attr::BOLD),
                2 => style.attrs.insert(Attr::DIM),
                3 => style.attrs.insert(Attr::ITALIC),
                4 => style.attrs.insert(Attr::UNDERLINE),
                5 => style.attrs.insert(Attr::BLINK),
                7 => style.attrs.insert(Attr::INVERSE),
                8 => style.attrs.insert(Attr::HIDDEN),
                9 => style.attrs.insert(Attr::STRIKETHROUGH),
                21 | 22 => style.attrs.remove(Attr::BOLD | Attr::DIM),
                23 => style.attrs.remove(Attr::ITALIC),
                24 => style.attrs.remove(Attr::UNDERLINE),
                25 => style.attrs.remove(Attr::BLINK),
                27 => style.attrs.remove(Attr::INVERSE),
                28 => style.attrs.remove(Attr::HIDDEN),
                29 => style.attrs.remove(Attr::STRIKETHROUGH),
                30..=37 => style.fg = Rgba::ansi((code - 30) as u8),
                39 => style.fg = self.base.fg,
                40..=47 => style.bg = Rgba::ansi((code - 40) as u8),
                49 => style.bg = self.base.bg,
                90..=97 => style.fg = Rgba::ansi((code - 90 + 8) as u8),
                100..=107 => style.bg = Rgba::ansi((code - 100 + 8) as u8),
                38 => {
                    if let Some(color) = extended_color(&codes, &mut i) {
                        style.fg = color;
                    }
                }
                48 => {
                    if let Some(color) = extended_color(&codes, &mut i) {
                        style.bg = color;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Apply every escape sequence found in `escapes`.
    pub fn apply_all(&mut self, escapes: &str) {
        for seq in escape_sequences(escapes) {
            self.apply(seq);
        }
    }
}

/// `38;5;n` or `38;2;r;g;b` starting at `codes[*i]`; advances `i` past the
/// arguments it consumed.
fn extended_color(codes: &[u32], i: &mut usize) -> Option<Rgba> {
    match codes.get(*i + 1)? {
        5 => {
            let index = *codes.get(*i + 2)?;
            *i += 2;
            Some(Rgba::ansi(index.min(255) as u8))
        }
        2 => {
            let channel = |n: usize| codes.get(*i + n).map(|v| (*v).min(255) as u8);
            let (r, g, b) = (channel(2)?, channel(3)?, channel(4)?);
            *i += 4;
            Some(Rgba::rgb(r, g, b))
        }
        _ => None,
    }
}

/// A grapheme with the style in effect when it is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledGrapheme<'a> {
    pub grapheme: &'a str,
    pub width: usize,
    pub style: CellStyle,
}

/// Interpret `line` on top of `base`, yielding each visible grapheme with
/// its resolved style. Zero-width graphemes are skipped.
pub fn styled_graphemes(line: &str, base: CellStyle) -> Vec<StyledGrapheme<'_>> {
    let (units, _) = split_units(line);
    let mut state = SgrState::new(base);
    let mut out = Vec::with_capacity(units.len());
    for unit in units {
        state.apply_all(unit.prefix);
        if unit.width > 0 {
            out.push(StyledGrapheme {
                grapheme: unit.grapheme,
                width: unit.width,
                style: state.current(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CellStyle {
        CellStyle {
            fg: Rgba::GREEN,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::ITALIC,
        }
    }

    #[test]
    fn test_plain_text_keeps_base() {
        let out = styled_graphemes("ab", base());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|g| g.style == base()));
    }

    #[test]
    fn test_colors_and_attrs() {
        let mut state = SgrState::new(base());
        state.apply("\x1b[1;31;44m");
        let style = state.current();
        assert_eq!(style.fg, Rgba::RED);
        assert_eq!(style.bg, Rgba::BLUE);
        assert_eq!(style.attrs, Attr::ITALIC | Attr::BOLD);

        state.apply("\x1b[22;39m");
        assert_eq!(state.current().fg, Rgba::GREEN);
        assert_eq!(state.current().attrs, Attr::ITALIC);
    }

    #[test]
    fn test_reset_returns_to_base() {
        let out = styled_graphemes("\x1b[1;35ma\x1b[0mb", base());
        assert_eq!(out[0].style.fg, Rgba::MAGENTA);
        assert_eq!(out[1].style, base());
    }

    #[test]
    fn test_extended_colors() {
        let mut state = SgrState::new(CellStyle::default());
        state.apply("\x1b[38;5;208;48;2;1;2;3m");
        assert_eq!(state.current().fg, Rgba::ansi(208));
        assert_eq!(state.current().bg, Rgba::rgb(1, 2, 3));

        state.apply("\x1b[92m");
        assert_eq!(state.current().fg, Rgba::ansi(10));
    }

    #[test]
    fn test_ignores_other_sequences() {
        let mut state = SgrState::new(base());
        state.apply("\x1b[2K");
        state.apply("\x1b]8;;http://x\x07");
        state.apply("\x1b[?25l");
        assert_eq!(state.current(), base());
    }

    #[test]
    fn test_wide_graphemes_report_width() {
        let out = styled_graphemes("中a", CellStyle::default());
        assert_eq!(out[0].width, 2);
        assert_eq!(out[1].width, 1);
    }
}
