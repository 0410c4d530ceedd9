//! Grapheme-safe truncation with an ellipsis.

use super::ansi::{escapes_only, split_units, Unit};
use super::width::string_width;

pub const ELLIPSIS: &str = "…";

/// Where the cut happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TruncatePosition {
    #[default]
    End,
    Start,
    Middle,
}

/// Truncate `text` to `max_width` columns with [`ELLIPSIS`] at `position`.
///
/// Text that already fits is returned unchanged. Escape sequences of the
/// removed part are kept so styling stays balanced.
pub fn truncate_text(text: &str, max_width: usize, position: TruncatePosition) -> String {
    truncate_with(text, max_width, position, ELLIPSIS)
}

/// Like [`truncate_text`] with a caller-chosen marker.
pub fn truncate_with(text: &str, max_width: usize, position: TruncatePosition, marker: &str) -> String {
    if string_width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return escapes_only(text);
    }

    let marker_width = string_width(marker);
    if marker_width >= max_width {
        return truncate_exact(marker, max_width);
    }
    let budget = max_width - marker_width;
    let (units, trailing) = split_units(text);

    let mut out = String::new();
    match position {
        TruncatePosition::End => {
            let keep = fit_from_start(&units, budget);
            push_units(&units[..keep], &mut out);
            out.push_str(marker);
            push_escapes(&units[keep..], &mut out);
        }
        TruncatePosition::Start => {
            let from = fit_from_end(&units, budget);
            push_escapes(&units[..from], &mut out);
            out.push_str(marker);
            push_units(&units[from..], &mut out);
        }
        TruncatePosition::Middle => {
            let left_budget = budget.div_ceil(2);
            let head = fit_from_start(&units, left_budget);
            let tail = fit_from_end(&units[head..], budget - left_budget) + head;
            push_units(&units[..head], &mut out);
            out.push_str(marker);
            push_escapes(&units[head..tail], &mut out);
            push_units(&units[tail..], &mut out);
        }
    }
    out.push_str(trailing);
    out
}

/// Cut to at most `max_width` columns without a marker.
pub fn truncate_exact(text: &str, max_width: usize) -> String {
    let (units, trailing) = split_units(text);
    let keep = fit_from_start(&units, max_width);
    let mut out = String::new();
    push_units(&units[..keep], &mut out);
    push_escapes(&units[keep..], &mut out);
    out.push_str(trailing);
    out
}

/// Number of leading units whose widths fit in `budget`.
fn fit_from_start(units: &[Unit<'_>], budget: usize) -> usize {
    let mut width = 0;
    for (i, unit) in units.iter().enumerate() {
        if width + unit.width > budget {
            return i;
        }
        width += unit.width;
    }
    units.len()
}

/// Index of the first unit of the longest suffix fitting in `budget`.
fn fit_from_end(units: &[Unit<'_>], budget: usize) -> usize {
    let mut width = 0;
    for (i, unit) in units.iter().enumerate().rev() {
        if width + unit.width > budget {
            return i + 1;
        }
        width += unit.width;
    }
    0
}

fn push_units(units: &[Unit<'_>], out: &mut String) {
    for unit in units {
        unit.push_to(out);
    }
}

fn push_escapes(units: &[Unit<'_>], out: &mut String) {
    for unit in units {
        out.push_str(unit.prefix);
    }
}
