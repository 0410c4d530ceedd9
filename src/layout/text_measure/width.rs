//! Display width of characters, grapheme clusters and strings.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ansi::strip_ansi;

/// Width of a single codepoint: 0 for controls and combining marks, 2 for
/// East Asian wide and fullwidth characters and emoji presentation, else 1.
#[inline]
pub fn char_width(c: char) -> usize {
    if c.is_control() {
        return 0;
    }
    c.width().unwrap_or(0)
}

/// Width of a grapheme cluster.
///
/// - `é` (e + combining acute) → 1
/// - `👨‍👩‍👧` (ZWJ sequence) → 2
/// - `🇺🇸` (regional indicator pair) → 2
/// - `👍🏽` (skin tone modifier) → 2
/// - `❤️` (VS16 emoji presentation) → 2
pub fn grapheme_width(grapheme: &str) -> usize {
    let mut chars = grapheme.chars();
    let Some(first) = chars.next() else {
        return 0;
    };

    if grapheme.len() == first.len_utf8() {
        return char_width(first);
    }

    if (0x1F1E6..=0x1F1FF).contains(&(first as u32)) {
        return 2;
    }

    for c in chars {
        match c as u32 {
            0x200D | 0xFE0F | 0x20E3 | 0x1F3FB..=0x1F3FF => return 2,
            _ => {}
        }
    }

    char_width(first)
}

/// Width of a string in terminal columns; escape sequences count as zero.
pub fn string_width(s: &str) -> usize {
    if s.is_empty() {
        return 0;
    }

    if s.is_ascii() && !s.as_bytes().contains(&0x1B) {
        return s.bytes().filter(|b| (0x20..0x7F).contains(b)).count();
    }

    strip_ansi(s).graphemes(true).map(grapheme_width).sum()
}

/// Widest line and number of lines, without any wrapping.
pub fn natural_size(s: &str) -> (usize, usize) {
    if s.is_empty() {
        return (0, 0);
    }
    s.split('\n')
        .fold((0, 0), |(width, height), line| (width.max(string_width(line)), height + 1))
}
