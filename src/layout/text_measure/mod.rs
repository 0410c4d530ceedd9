//! Text measurement for terminal rendering.
//!
//! - **Width**: terminal columns for any Unicode text (`unicode-width`
//!   East Asian Width tables, `unicode-segmentation` grapheme clusters)
//! - **Escapes**: CSI, OSC and two-byte sequences are zero width and are
//!   preserved through wrapping and truncation
//! - **Wrapping**: greedy word wrap and character wrap
//! - **Truncation**: end, start or middle with an ellipsis
//!
//! Every function here is pure.

mod ansi;
mod truncate;
mod width;
mod wrap;

pub(crate) use ansi::{escape_sequences, split_units};
pub use ansi::{escapes_only, strip_ansi};
pub use truncate::{truncate_exact, truncate_text, truncate_with, TruncatePosition, ELLIPSIS};
pub use width::{char_width, grapheme_width, natural_size, string_width};
pub use wrap::{widest_word, wrap_text, wrap_text_word};

use crate::types::TextWrap;

/// Size of a text block fitted to an available width, with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMeasurement {
    pub width: usize,
    pub height: usize,
    pub lines: Vec<String>,
}

/// Measure `text` word-wrapped to `available_width`.
///
/// ```
/// use weft::layout::text_measure::measure;
///
/// let m = measure("Hello World", 6);
/// assert_eq!((m.width, m.height), (5, 2));
/// assert_eq!(measure("", 10).height, 0);
/// ```
pub fn measure(text: &str, available_width: usize) -> TextMeasurement {
    measure_with(text, available_width, TextWrap::Wrap)
}

/// Measure `text` fitted to `available_width` with the given wrap mode.
pub fn measure_with(text: &str, available_width: usize, mode: TextWrap) -> TextMeasurement {
    let lines = layout_lines(text, available_width, mode);
    let width = lines.iter().map(|l| string_width(l)).max().unwrap_or(0);
    TextMeasurement {
        width,
        height: lines.len(),
        lines,
    }
}

/// The lines `text` occupies at `available_width`.
///
/// Text whose natural width fits is only split on newlines. A width of zero
/// means "unconstrained".
pub fn layout_lines(text: &str, available_width: usize, mode: TextWrap) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let (natural_width, _) = natural_size(text);
    if available_width == 0 || natural_width <= available_width {
        return text.split('\n').map(str::to_string).collect();
    }

    let position = match mode {
        TextWrap::Wrap => return wrap_text_word(text, available_width),
        TextWrap::Truncate => TruncatePosition::End,
        TextWrap::TruncateStart => TruncatePosition::Start,
        TextWrap::TruncateMiddle => TruncatePosition::Middle,
    };
    text.split('\n')
        .map(|line| truncate_text(line, available_width, position))
        .collect()
}

/// Narrowest width the text can be laid out at without overflowing.
pub fn min_content_width(text: &str, mode: TextWrap) -> usize {
    match mode {
        TextWrap::Wrap => widest_word(text),
        _ => natural_size(text).0.min(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_natural() {
        let m = measure("Hello\nWorld!", 80);
        assert_eq!((m.width, m.height), (6, 2));
    }

    #[test]
    fn test_measure_wrapped() {
        let m = measure("The quick brown fox", 10);
        assert_eq!(m.lines, vec!["The quick", "brown fox"]);
        assert_eq!((m.width, m.height), (9, 2));
    }

    #[test]
    fn test_measure_zero_width_is_unconstrained() {
        let m = measure("Hello World", 0);
        assert_eq!((m.width, m.height), (11, 1));
    }

    #[test]
    fn test_measure_truncated() {
        let m = measure_with("Hello World!", 10, TextWrap::Truncate);
        assert_eq!(m.lines, vec!["Hello Wor…"]);
        assert_eq!((m.width, m.height), (10, 1));
    }

    #[test]
    fn test_min_content_width() {
        assert_eq!(min_content_width("Hello World!", TextWrap::Wrap), 6);
        assert_eq!(min_content_width("Hello World!", TextWrap::Truncate), 1);
        assert_eq!(min_content_width("", TextWrap::TruncateMiddle), 0);
    }
}
