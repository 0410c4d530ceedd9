//! Core value types shared by the node tree, the layout adapter and the renderer.
//!
//! Nothing in here owns state. Colors, dimensions, cells and the small flex
//! enums are plain values that flow from [`Style`](crate::Style) down to the
//! [`FrameBuffer`](crate::renderer::FrameBuffer).

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels stored as `i16`.
///
/// Two sentinel encodings live in the red channel:
/// - `r == -1`: terminal default (SGR 39 / 49)
/// - `r == -2`: ANSI palette color, index in `g`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Default for Rgba {
    fn default() -> Self {
        Self::TERMINAL_DEFAULT
    }
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Opaque truecolor value.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Let the terminal pick.
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    pub const BLACK: Self = Self::ansi(0);
    pub const RED: Self = Self::ansi(1);
    pub const GREEN: Self = Self::ansi(2);
    pub const YELLOW: Self = Self::ansi(3);
    pub const BLUE: Self = Self::ansi(4);
    pub const MAGENTA: Self = Self::ansi(5);
    pub const CYAN: Self = Self::ansi(6);
    pub const WHITE: Self = Self::ansi(7);
    pub const GRAY: Self = Self::ansi(8);

    /// ANSI palette color (0-255).
    ///
    /// - 0-7: standard colors
    /// - 8-15: bright colors
    /// - 16-231: 6x6x6 cube
    /// - 232-255: grayscale ramp
    pub const fn ansi(index: u8) -> Self {
        Self {
            r: -2,
            g: index as i16,
            b: 0,
            a: 255,
        }
    }

    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }

    #[inline]
    pub const fn is_ansi(&self) -> bool {
        self.r == -2
    }

    /// Palette index; only meaningful when [`is_ansi`](Self::is_ansi) holds.
    #[inline]
    pub const fn ansi_index(&self) -> u8 {
        self.g as u8
    }

    /// Create from a packed `0xRRGGBB` integer.
    pub const fn from_rgb_int(value: u32) -> Self {
        Self::rgb(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = digits.as_bytes();

        fn nibble(byte: u8) -> Option<u8> {
            (byte as char).to_digit(16).map(|d| d as u8)
        }
        fn pair(bytes: &[u8], at: usize) -> Option<u8> {
            Some((nibble(bytes[at])? << 4) | nibble(bytes[at + 1])?)
        }

        match bytes.len() {
            3 => {
                let r = nibble(bytes[0])?;
                let g = nibble(bytes[1])?;
                let b = nibble(bytes[2])?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(pair(bytes, 0)?, pair(bytes, 2)?, pair(bytes, 4)?)),
            8 => Some(Self::new(
                pair(bytes, 0)?,
                pair(bytes, 2)?,
                pair(bytes, 4)?,
                pair(bytes, 6)?,
            )),
            _ => None,
        }
    }

    /// Look up one of the sixteen named ANSI colors.
    ///
    /// Accepts both `redBright` and `bright-red` / `bright_red` spellings,
    /// plus `gray`/`grey` for bright black.
    pub fn named(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase().replace(['-', '_'], "");
        let (base, bright) = if let Some(rest) = lower.strip_prefix("bright") {
            (rest.to_string(), true)
        } else if let Some(rest) = lower.strip_suffix("bright") {
            (rest.to_string(), true)
        } else {
            (lower, false)
        };

        let index = match base.as_str() {
            "black" => 0,
            "red" => 1,
            "green" => 2,
            "yellow" => 3,
            "blue" => 4,
            "magenta" => 5,
            "cyan" => 6,
            "white" => 7,
            "gray" | "grey" if !bright => return Some(Self::GRAY),
            _ => return None,
        };
        Some(Self::ansi(if bright { index + 8 } else { index }))
    }

    /// Parse any supported notation: keywords, named ANSI colors,
    /// `ansi256(n)` and hex.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let lower = input.to_ascii_lowercase();
        if matches!(lower.as_str(), "default" | "inherit" | "initial" | "reset") {
            return Some(Self::TERMINAL_DEFAULT);
        }

        if let Some(inner) = lower
            .strip_prefix("ansi256(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return inner.trim().parse::<u8>().ok().map(Self::ansi);
        }

        if let Some(color) = Self::named(&lower) {
            return Some(color);
        }

        if input.starts_with('#') || input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(input);
        }

        None
    }

    /// SGR parameters selecting this color as foreground.
    pub fn fg_params(&self) -> String {
        self.sgr_params(38, 30, 90, 39)
    }

    /// SGR parameters selecting this color as background.
    pub fn bg_params(&self) -> String {
        self.sgr_params(48, 40, 100, 49)
    }

    fn sgr_params(&self, extended: u8, base: u8, bright: u8, reset: u8) -> String {
        if self.is_terminal_default() {
            return reset.to_string();
        }
        if self.is_ansi() {
            let index = self.ansi_index();
            return match index {
                0..=7 => (base + index).to_string(),
                8..=15 => (bright + index - 8).to_string(),
                _ => format!("{extended};5;{index}"),
            };
        }
        format!("{extended};2;{};{};{}", self.r, self.g, self.b)
    }
}

// =============================================================================
// Dimension
// =============================================================================

/// A length that can be content-sized, absolute or relative to the parent.
///
/// ```
/// use weft::types::Dimension;
///
/// let width = Dimension::Cells(50);
/// let height = Dimension::Percent(100.0);
/// assert_eq!(Dimension::from(12), Dimension::Cells(12));
/// assert_eq!(Dimension::default(), Dimension::Auto);
/// # let _ = (width, height);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    /// Sized by content or by the flex algorithm.
    #[default]
    Auto,
    /// Absolute size in terminal cells.
    Cells(u16),
    /// Percentage of the parent (0-100).
    Percent(f32),
}

impl Dimension {
    pub const fn percent(value: f32) -> Self {
        Self::Percent(value)
    }
}

impl From<u16> for Dimension {
    fn from(value: u16) -> Self {
        Self::Cells(value)
    }
}

impl From<i32> for Dimension {
    fn from(value: i32) -> Self {
        Self::Cells(value.clamp(0, u16::MAX as i32) as u16)
    }
}

/// Width and height in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

// =============================================================================
// Cell Attributes
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Which edges of a box carry a border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Sides: u8 {
        const TOP = 1 << 0;
        const RIGHT = 1 << 1;
        const BOTTOM = 1 << 2;
        const LEFT = 1 << 3;
    }
}

impl Default for Sides {
    fn default() -> Self {
        Self::all()
    }
}

// =============================================================================
// Cell
// =============================================================================

/// What a single cell displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// A grapheme made of a single scalar value.
    Char(char),
    /// A multi-codepoint grapheme cluster (ZWJ sequences, flags, combining marks).
    Cluster(Box<str>),
    /// Right half of a double-width glyph in the cell to the left.
    Continuation,
}

impl Glyph {
    pub const BLANK: Self = Self::Char(' ');

    pub fn from_grapheme(grapheme: &str) -> Self {
        let mut chars = grapheme.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::Char(c),
            (Some(_), Some(_)) => Self::Cluster(grapheme.into()),
            (None, _) => Self::BLANK,
        }
    }

    #[inline]
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::Continuation)
    }

    /// Append the visible text of this glyph; continuations add nothing.
    pub fn push_to(&self, out: &mut String) {
        match self {
            Self::Char(c) => out.push(*c),
            Self::Cluster(s) => out.push_str(s),
            Self::Continuation => {}
        }
    }
}

/// Foreground, background and attributes applied to a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellStyle {
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

/// A single terminal cell: what the compositor produces and the diff
/// renderer compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub glyph: Glyph,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: Glyph::BLANK,
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::NONE,
        }
    }
}

impl Cell {
    pub fn styled(glyph: Glyph, style: CellStyle) -> Self {
        Self {
            glyph,
            fg: style.fg,
            bg: style.bg,
            attrs: style.attrs,
        }
    }

    #[inline]
    pub fn style(&self) -> CellStyle {
        CellStyle {
            fg: self.fg,
            bg: self.bg,
            attrs: self.attrs,
        }
    }

    /// A space with nothing visible to emit.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.glyph == Glyph::BLANK
            && self.bg.is_terminal_default()
            && !self
                .attrs
                .intersects(Attr::INVERSE | Attr::UNDERLINE | Attr::STRIKETHROUGH)
    }
}

// =============================================================================
// ClipRect
// =============================================================================

/// Clipping rectangle in absolute frame coordinates.
///
/// Origins are signed: absolutely positioned nodes and negative offsets can
/// place a box partly above or left of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl ClipRect {
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersect(&self, other: &ClipRect) -> Option<ClipRect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            Some(ClipRect::new(x1, y1, (x2 - x1) as u16, (y2 - y1) as u16))
        } else {
            None
        }
    }

    /// Shrink by the given edge widths, saturating at zero size.
    pub fn inset(&self, top: u16, right: u16, bottom: u16, left: u16) -> ClipRect {
        ClipRect::new(
            self.x + left as i32,
            self.y + top as i32,
            self.width.saturating_sub(left.saturating_add(right)),
            self.height.saturating_sub(top.saturating_add(bottom)),
        )
    }
}

// =============================================================================
// Border Styles
// =============================================================================

/// Box-drawing character sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    /// ─ │ ┌ ┐ └ ┘
    Single,
    /// ═ ║ ╔ ╗ ╚ ╝
    Double,
    /// ─ │ ╭ ╮ ╰ ╯
    Round,
    /// ━ ┃ ┏ ┓ ┗ ┛
    Bold,
    /// ┄ ┆ ┌ ┐ └ ┘
    Dashed,
    /// - | + + + +
    Classic,
    /// ═ │ ╒ ╕ ╘ ╛
    DoubleSingle,
    /// ─ ║ ╓ ╖ ╙ ╜
    SingleDouble,
}

/// The six glyphs a border is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_right: char,
    pub bottom_left: char,
}

impl BorderStyle {
    pub const fn is_visible(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub const fn chars(&self) -> BorderChars {
        let (horizontal, vertical, top_left, top_right, bottom_right, bottom_left) = match self {
            Self::None => (' ', ' ', ' ', ' ', ' ', ' '),
            Self::Single => ('─', '│', '┌', '┐', '┘', '└'),
            Self::Double => ('═', '║', '╔', '╗', '╝', '╚'),
            Self::Round => ('─', '│', '╭', '╮', '╯', '╰'),
            Self::Bold => ('━', '┃', '┏', '┓', '┛', '┗'),
            Self::Dashed => ('┄', '┆', '┌', '┐', '┘', '└'),
            Self::Classic => ('-', '|', '+', '+', '+', '+'),
            Self::DoubleSingle => ('═', '│', '╒', '╕', '╛', '╘'),
            Self::SingleDouble => ('─', '║', '╓', '╖', '╜', '╙'),
        };
        BorderChars {
            horizontal,
            vertical,
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }
}

// =============================================================================
// Flex Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

impl FlexDirection {
    pub const fn is_row(&self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexWrap {
    #[default]
    NoWrap,
    Wrap,
    WrapReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyContent {
    #[default]
    FlexStart,
    Center,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignItems {
    #[default]
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignSelf {
    /// Use the parent's `align_items`.
    #[default]
    Auto,
    Stretch,
    FlexStart,
    Center,
    FlexEnd,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignContent {
    #[default]
    FlexStart,
    Center,
    FlexEnd,
    Stretch,
    SpaceBetween,
    SpaceAround,
}

/// Whether children may paint outside the content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Flex,
    None,
}

/// How text that is wider than its box is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextWrap {
    /// Greedy word wrap.
    #[default]
    Wrap,
    /// Cut at the end and append an ellipsis.
    Truncate,
    TruncateStart,
    TruncateMiddle,
}

// =============================================================================
// Render Mode
// =============================================================================

/// How an instance addresses the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Renders below the prompt and updates in place.
    #[default]
    Inline,
    /// Alternate screen buffer, absolute addressing.
    Fullscreen,
    /// Non-interactive output: no cursor codes, final frame printed once.
    Plain,
}

impl RenderMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(Self::Inline),
            "fullscreen" | "alternate" => Some(Self::Fullscreen),
            "plain" | "static" => Some(Self::Plain),
            _ => None,
        }
    }

    pub const fn is_interactive(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_from_rgb_int() {
        assert_eq!(Rgba::from_rgb_int(0xff0000), Rgba::rgb(255, 0, 0));
        assert_eq!(Rgba::from_rgb_int(0x282a36), Rgba::rgb(40, 42, 54));
    }

    #[test]
    fn test_rgba_from_hex() {
        assert_eq!(Rgba::from_hex("#00ff00"), Some(Rgba::rgb(0, 255, 0)));
        assert_eq!(Rgba::from_hex("abc"), Some(Rgba::rgb(0xaa, 0xbb, 0xcc)));
        assert_eq!(Rgba::from_hex("#ff000080"), Some(Rgba::new(255, 0, 0, 128)));
        assert_eq!(Rgba::from_hex("#ff00"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_rgba_named() {
        assert_eq!(Rgba::named("red"), Some(Rgba::ansi(1)));
        assert_eq!(Rgba::named("redBright"), Some(Rgba::ansi(9)));
        assert_eq!(Rgba::named("bright-blue"), Some(Rgba::ansi(12)));
        assert_eq!(Rgba::named("grey"), Some(Rgba::GRAY));
        assert_eq!(Rgba::named("orange"), None);
    }

    #[test]
    fn test_rgba_parse() {
        assert!(Rgba::parse("default").is_some_and(|c| c.is_terminal_default()));
        assert_eq!(Rgba::parse(" ansi256(208) "), Some(Rgba::ansi(208)));
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::rgb(255, 255, 255)));
        assert_eq!(Rgba::parse("Cyan"), Some(Rgba::CYAN));
        assert!(Rgba::parse("").is_none());
        assert!(Rgba::parse("rgb(1, 2, 3)").is_none());
    }

    #[test]
    fn test_sgr_params() {
        assert_eq!(Rgba::TERMINAL_DEFAULT.fg_params(), "39");
        assert_eq!(Rgba::TERMINAL_DEFAULT.bg_params(), "49");
        assert_eq!(Rgba::RED.fg_params(), "31");
        assert_eq!(Rgba::ansi(9).fg_params(), "91");
        assert_eq!(Rgba::ansi(12).bg_params(), "104");
        assert_eq!(Rgba::ansi(196).fg_params(), "38;5;196");
        assert_eq!(Rgba::rgb(1, 2, 3).bg_params(), "48;2;1;2;3");
    }

    #[test]
    fn test_dimension_from() {
        assert_eq!(Dimension::from(0u16), Dimension::Cells(0));
        assert_eq!(Dimension::from(-4), Dimension::Cells(0));
        assert_eq!(Dimension::from(70_000), Dimension::Cells(u16::MAX));
    }

    #[test]
    fn test_glyph_from_grapheme() {
        assert_eq!(Glyph::from_grapheme("a"), Glyph::Char('a'));
        assert_eq!(
            Glyph::from_grapheme("e\u{301}"),
            Glyph::Cluster("e\u{301}".into())
        );
        assert_eq!(Glyph::from_grapheme(""), Glyph::BLANK);
    }

    #[test]
    fn test_clip_rect_intersect() {
        let a = ClipRect::new(0, 0, 10, 10);
        let b = ClipRect::new(5, -3, 10, 5);
        assert_eq!(a.intersect(&b), Some(ClipRect::new(5, 0, 5, 2)));
        assert_eq!(a.intersect(&ClipRect::new(10, 0, 3, 3)), None);
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 0));
    }

    #[test]
    fn test_clip_rect_inset() {
        let rect = ClipRect::new(2, 2, 6, 4).inset(1, 1, 1, 1);
        assert_eq!(rect, ClipRect::new(3, 3, 4, 2));
        let collapsed = ClipRect::new(0, 0, 1, 1).inset(1, 1, 1, 1);
        assert_eq!(collapsed.width, 0);
        assert_eq!(collapsed.height, 0);
    }

    #[test]
    fn test_border_chars() {
        let round = BorderStyle::Round.chars();
        assert_eq!(round.top_left, '╭');
        assert_eq!(round.bottom_right, '╯');
        assert!(!BorderStyle::None.is_visible());
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!(RenderMode::parse("Fullscreen"), Some(RenderMode::Fullscreen));
        assert_eq!(RenderMode::parse("plain"), Some(RenderMode::Plain));
        assert_eq!(RenderMode::parse("tty"), None);
    }
}
