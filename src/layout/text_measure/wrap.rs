//! Text wrapping.
//!
//! Both modes split on `\n` first, then fit each line to `max_width`
//! columns. Escape sequences are carried along in place and never counted.

use super::ansi::{split_units, Unit};

/// Character-break wrap: break at grapheme boundaries only.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    if max_width == 0 {
        return text.split('\n').map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let (units, trailing) = split_units(raw_line);
        let mut line = LineBuilder::new(max_width);
        for unit in units {
            line.push_breaking(unit, &mut lines);
        }
        line.finish(trailing, &mut lines);
    }
    lines
}

/// Greedy word wrap.
///
/// Words are whitespace-delimited runs. A word that does not fit on the
/// current line moves to the next; a word wider than `max_width` is split
/// at grapheme boundaries. Whitespace at a break is dropped. A single
/// grapheme wider than `max_width` is dropped, keeping its escapes.
pub fn wrap_text_word(text: &str, max_width: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    if max_width == 0 {
        return text.split('\n').map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        wrap_line_word(raw_line, max_width, &mut lines);
    }
    lines
}

fn wrap_line_word(raw_line: &str, max_width: usize, lines: &mut Vec<String>) {
    let (units, trailing) = split_units(raw_line);
    let mut line = LineBuilder::new(max_width);

    for word in words(&units) {
        let word_width: usize = word.iter().map(|u| u.width).sum();
        let is_space = word[0].is_whitespace();

        if line.width + word_width > max_width {
            if is_space {
                line.extend(word.iter().map(|u| u.escapes_only()));
                continue;
            }
            if line.width > 0 {
                line.flush(lines);
            }
            if word_width > max_width {
                for unit in word {
                    line.push_breaking(*unit, lines);
                }
                continue;
            }
        }

        line.extend(word.iter().copied());
    }

    line.finish(trailing, lines);
}

/// Group units into alternating whitespace and non-whitespace runs.
fn words<'u, 'a>(units: &'u [Unit<'a>]) -> impl Iterator<Item = &'u [Unit<'a>]> {
    units.chunk_by(|a, b| a.is_whitespace() == b.is_whitespace())
}

/// Widest whitespace-delimited word: the narrowest a wrapped text can get.
pub fn widest_word(text: &str) -> usize {
    text.split('\n')
        .map(|raw_line| {
            let (units, _) = split_units(raw_line);
            words(&units)
                .filter(|word| !word[0].is_whitespace())
                .map(|word| word.iter().map(|u| u.width).sum::<usize>())
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

// =============================================================================
// Line builder
// =============================================================================

struct LineBuilder<'a> {
    units: Vec<Unit<'a>>,
    width: usize,
    max_width: usize,
}

impl<'a> LineBuilder<'a> {
    fn new(max_width: usize) -> Self {
        Self {
            units: Vec::new(),
            width: 0,
            max_width,
        }
    }

    fn extend(&mut self, units: impl IntoIterator<Item = Unit<'a>>) {
        for unit in units {
            self.width += unit.width;
            self.units.push(unit);
        }
    }

    /// Append one unit, breaking the line first if it would overflow.
    fn push_breaking(&mut self, unit: Unit<'a>, lines: &mut Vec<String>) {
        if unit.width > self.max_width {
            self.units.push(unit.escapes_only());
            return;
        }
        if self.width + unit.width > self.max_width && self.width > 0 {
            self.flush(lines);
        }
        self.width += unit.width;
        self.units.push(unit);
    }

    /// Emit the current line without its trailing whitespace.
    fn flush(&mut self, lines: &mut Vec<String>) {
        let keep = self
            .units
            .iter()
            .rposition(|u| !u.is_whitespace() && u.width > 0)
            .map_or(0, |i| i + 1);
        let mut out = String::new();
        for (i, unit) in self.units.drain(..).enumerate() {
            if i < keep {
                unit.push_to(&mut out);
            } else {
                out.push_str(unit.prefix);
            }
        }
        lines.push(out);
        self.width = 0;
    }

    fn finish(mut self, trailing: &str, lines: &mut Vec<String>) {
        let mut out = String::new();
        for unit in self.units.drain(..) {
            unit.push_to(&mut out);
        }
        out.push_str(trailing);
        lines.push(out);
    }
}

#[cfg(test)]
mod tests {
    use super::super::width::string_width;
    use super::*;

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_text_word("", 10).is_empty());
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_wrap_fits() {
        assert_eq!(wrap_text_word("hello world", 20), vec!["hello world"]);
    }

    #[test]
    fn test_wrap_at_word_boundary() {
        assert_eq!(
            wrap_text_word("hello world foo", 11),
            vec!["hello world", "foo"]
        );
        assert_eq!(wrap_text_word("hello world", 7), vec!["hello", "world"]);
    }

    #[test]
    fn test_wrap_keeps_punctuation_with_word() {
        assert_eq!(wrap_text_word("Hello, world!", 8), vec!["Hello,", "world!"]);
    }

    #[test]
    fn test_wrap_long_word_force_break() {
        assert_eq!(wrap_text_word("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text_word("hi abcdefgh", 4), vec!["hi", "abcd", "efgh"]);
    }

    #[test]
    fn test_wrap_explicit_newlines() {
        assert_eq!(wrap_text_word("a\n\nb", 5), vec!["a", "", "b"]);
    }

    #[test]
    fn test_wrap_cjk() {
        assert_eq!(wrap_text("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn test_wrap_drops_grapheme_wider_than_width() {
        assert_eq!(wrap_text_word("a中b", 1), vec!["a", "b"]);
    }

    #[test]
    fn test_wrap_preserves_escapes() {
        let lines = wrap_text_word("\x1b[31mhello world\x1b[0m", 5);
        assert_eq!(lines, vec!["\x1b[31mhello", "world\x1b[0m"]);
    }

    #[test]
    fn test_wrap_trims_space_but_keeps_its_escape() {
        let lines = wrap_text_word("ab\x1b[1m cd", 2);
        assert_eq!(lines, vec!["ab\x1b[1m", "cd"]);
    }

    #[test]
    fn test_wrap_width_invariant() {
        let text = "The quick brown fox jumps over the lazy dog, 日本語 テキスト 👨‍👩‍👧 ok";
        for width in 1..30 {
            for line in wrap_text_word(text, width) {
                assert!(string_width(&line) <= width, "{line:?} exceeds {width}");
            }
        }
    }

    #[test]
    fn test_widest_word() {
        assert_eq!(widest_word("Hello World!"), 6);
        assert_eq!(widest_word("a\nbbb cc"), 3);
        assert_eq!(widest_word(""), 0);
    }
}
