//! Node styles: a tagged struct of optional properties.
//!
//! Every field is `Option`. `None` means "not specified" and resolves to the
//! documented default when layout or painting reads it, which is what makes
//! partial updates through [`Style::merge`] possible.

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::{
    AlignContent, AlignItems, AlignSelf, Attr, BorderStyle, CellStyle, Dimension, Display,
    FlexDirection, FlexWrap, JustifyContent, Overflow, Position, Rgba, Sides, TextWrap,
};

// =============================================================================
// Edges
// =============================================================================

/// Per-edge lengths in cells, for margin and padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    pub const ZERO: Self = Self::all(0);

    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn all(value: u16) -> Self {
        Self::new(value, value, value, value)
    }

    /// Horizontal (`left`/`right`) and vertical (`top`/`bottom`) values.
    pub const fn xy(x: u16, y: u16) -> Self {
        Self::new(y, x, y, x)
    }
}

// =============================================================================
// Style
// =============================================================================

/// Layout and appearance properties of a node.
///
/// ```
/// use weft::{Edges, Style};
/// use weft::types::{BorderStyle, FlexDirection};
///
/// let style = Style::new()
///     .flex_direction(FlexDirection::Column)
///     .width(20)
///     .padding(Edges::xy(1, 0))
///     .border_style(BorderStyle::Round);
/// assert!(style.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub display: Option<Display>,
    pub position: Option<Position>,
    pub top: Option<Dimension>,
    pub right: Option<Dimension>,
    pub bottom: Option<Dimension>,
    pub left: Option<Dimension>,

    pub flex_direction: Option<FlexDirection>,
    pub flex_wrap: Option<FlexWrap>,
    pub flex_grow: Option<f32>,
    pub flex_shrink: Option<f32>,
    pub flex_basis: Option<Dimension>,
    pub justify_content: Option<JustifyContent>,
    pub align_items: Option<AlignItems>,
    pub align_self: Option<AlignSelf>,
    pub align_content: Option<AlignContent>,

    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub min_width: Option<Dimension>,
    pub min_height: Option<Dimension>,
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,

    pub margin: Option<Edges>,
    pub padding: Option<Edges>,
    pub gap: Option<u16>,
    pub column_gap: Option<u16>,
    pub row_gap: Option<u16>,

    pub border_style: Option<BorderStyle>,
    /// Defaults to all four sides once a border style is set.
    pub border_sides: Option<Sides>,
    pub border_color: Option<Rgba>,
    pub overflow: Option<Overflow>,

    pub wrap: Option<TextWrap>,
    pub color: Option<Rgba>,
    pub background: Option<Rgba>,
    pub bold: Option<bool>,
    pub dim: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub inverse: Option<bool>,
}

macro_rules! setters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[must_use]
            pub fn $name(mut self, value: $ty) -> Self {
                self.$name = Some(value);
                self
            }
        )*
    };
}

macro_rules! dimension_setters {
    ($($name:ident),* $(,)?) => {
        $(
            #[must_use]
            pub fn $name(mut self, value: impl Into<Dimension>) -> Self {
                self.$name = Some(value.into());
                self
            }
        )*
    };
}

macro_rules! merge_fields {
    ($target:ident, $patch:ident; $($name:ident),* $(,)?) => {
        $(
            if $patch.$name.is_some() {
                $target.$name = $patch.$name;
            }
        )*
    };
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    setters! {
        display: Display,
        position: Position,
        flex_direction: FlexDirection,
        flex_wrap: FlexWrap,
        flex_grow: f32,
        flex_shrink: f32,
        justify_content: JustifyContent,
        align_items: AlignItems,
        align_self: AlignSelf,
        align_content: AlignContent,
        margin: Edges,
        padding: Edges,
        gap: u16,
        column_gap: u16,
        row_gap: u16,
        border_style: BorderStyle,
        border_sides: Sides,
        border_color: Rgba,
        overflow: Overflow,
        wrap: TextWrap,
        color: Rgba,
        background: Rgba,
        bold: bool,
        dim: bool,
        italic: bool,
        underline: bool,
        strikethrough: bool,
        inverse: bool,
    }

    dimension_setters! {
        top, right, bottom, left, flex_basis,
        width, height, min_width, min_height, max_width, max_height,
    }

    /// Overlay every field that is set in `patch`.
    pub fn merge(&mut self, patch: &Style) {
        merge_fields!(self, patch;
            display, position, top, right, bottom, left,
            flex_direction, flex_wrap, flex_grow, flex_shrink, flex_basis,
            justify_content, align_items, align_self, align_content,
            width, height, min_width, min_height, max_width, max_height,
            margin, padding, gap, column_gap, row_gap,
            border_style, border_sides, border_color, overflow,
            wrap, color, background, bold, dim, italic, underline, strikethrough, inverse,
        );
    }

    /// Reject values the layout solver cannot represent.
    pub fn validate(&self) -> Result<(), StyleError> {
        for (field, value) in [("flex_grow", self.flex_grow), ("flex_shrink", self.flex_shrink)] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(StyleError::InvalidFactor { field, value });
                }
            }
        }

        let dimensions = [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
            ("flex_basis", self.flex_basis),
            ("width", self.width),
            ("height", self.height),
            ("min_width", self.min_width),
            ("min_height", self.min_height),
            ("max_width", self.max_width),
            ("max_height", self.max_height),
        ];
        for (field, value) in dimensions {
            if let Some(Dimension::Percent(value)) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(StyleError::InvalidPercent { field, value });
                }
            }
        }

        Ok(())
    }

    /// Width of each border edge in cells.
    pub fn border_edges(&self) -> Edges {
        if !self.border_style.is_some_and(|b| b.is_visible()) {
            return Edges::ZERO;
        }
        let sides = self.border_sides.unwrap_or_default();
        let edge = |side: Sides| u16::from(sides.contains(side));
        Edges::new(
            edge(Sides::TOP),
            edge(Sides::RIGHT),
            edge(Sides::BOTTOM),
            edge(Sides::LEFT),
        )
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            color: self.color,
            background: self.background,
            bold: self.bold,
            dim: self.dim,
            italic: self.italic,
            underline: self.underline,
            strikethrough: self.strikethrough,
            inverse: self.inverse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StyleError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidFactor { field: &'static str, value: f32 },
    #[error("{field} percentage must be finite and non-negative (got {value})")]
    InvalidPercent { field: &'static str, value: f32 },
}

// =============================================================================
// Text Style
// =============================================================================

/// The inheritable subset of [`Style`]: what text looks like.
///
/// Text attributes cascade from ancestors: a child's `Some` values win, its
/// `None` values take the parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub color: Option<Rgba>,
    pub background: Option<Rgba>,
    pub bold: Option<bool>,
    pub dim: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub inverse: Option<bool>,
}

impl TextStyle {
    #[must_use]
    pub fn inherit(&self, parent: &TextStyle) -> TextStyle {
        TextStyle {
            color: self.color.or(parent.color),
            background: self.background.or(parent.background),
            bold: self.bold.or(parent.bold),
            dim: self.dim.or(parent.dim),
            italic: self.italic.or(parent.italic),
            underline: self.underline.or(parent.underline),
            strikethrough: self.strikethrough.or(parent.strikethrough),
            inverse: self.inverse.or(parent.inverse),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TextStyle::default()
    }

    /// Each attribute with its SGR on and off codes.
    fn flags(&self) -> [(Option<bool>, Attr, u8, u8); 6] {
        [
            (self.bold, Attr::BOLD, 1, 22),
            (self.dim, Attr::DIM, 2, 22),
            (self.italic, Attr::ITALIC, 3, 23),
            (self.underline, Attr::UNDERLINE, 4, 24),
            (self.strikethrough, Attr::STRIKETHROUGH, 9, 29),
            (self.inverse, Attr::INVERSE, 7, 27),
        ]
    }

    /// Resolve against the terminal defaults.
    pub fn to_cell_style(&self) -> CellStyle {
        let attrs = self
            .flags()
            .into_iter()
            .filter(|(on, ..)| on.unwrap_or(false))
            .fold(Attr::NONE, |acc, (_, attr, ..)| acc | attr);
        CellStyle {
            fg: self.color.unwrap_or_default(),
            bg: self.background.unwrap_or_default(),
            attrs,
        }
    }

    /// Append one SGR sequence expressing the set fields. Nothing is written
    /// for an empty style.
    ///
    /// Attributes switched off are emitted before those switched on, so bold
    /// and dim (which share the 22 reset) combine correctly.
    pub fn write_sgr(&self, out: &mut String) {
        let mut params: Vec<String> = Vec::new();
        for (on, _, _, off) in self.flags() {
            if on == Some(false) {
                params.push(off.to_string());
            }
        }
        for (on, _, code, _) in self.flags() {
            if on == Some(true) {
                params.push(code.to_string());
            }
        }
        if let Some(color) = self.color {
            params.push(color.fg_params());
        }
        if let Some(background) = self.background {
            params.push(background.bg_params());
        }
        if !params.is_empty() {
            let _ = write!(out, "\x1b[{}m", params.join(";"));
        }
    }
}
