//! FrameBuffer and drawing primitives.
//!
//! The FrameBuffer is a 2D grid of Cells that represents what should be displayed
//! on the terminal. All drawing operations work on this buffer.
//!
//! # Design Decisions
//!
//! - **Flat storage**: `Vec<Cell>` with row-major indexing.
//! - **Clipping**: every drawing call takes a `ClipRect` in frame
//!   coordinates; coordinates are signed so boxes may start off-frame.
//! - **Wide characters**: a double-width glyph occupies its cell plus a
//!   [`Glyph::Continuation`] cell. A glyph that would straddle a clip edge is
//!   not drawn, and overwriting half of a wide pair blanks the other half.
//! - **Default backgrounds are transparent**: drawing with the terminal
//!   default background keeps whatever background is already in the cell.

use crate::types::{Attr, BorderStyle, Cell, CellStyle, ClipRect, Glyph, Rgba, Sides};

/// A 2D buffer of terminal cells.
///
/// Uses flat storage with row-major indexing: `index = y * width + x`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a new buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The full buffer bounds as a ClipRect.
    #[inline]
    pub fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32
    }

    /// Get a cell reference (returns None if out of bounds).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x as i32, y as i32) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x as i32, y as i32) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// One row of cells; empty when `y` is out of bounds.
    pub fn row(&self, y: u16) -> &[Cell] {
        if y >= self.height {
            return &[];
        }
        let start = self.index(0, y);
        &self.cells[start..start + self.width as usize]
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        (0..self.height).map(move |y| self.row(y))
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the entire buffer to default cells.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    // =========================================================================
    // Drawing Primitives
    // =========================================================================

    /// Write one grapheme of the given display width at (x, y).
    ///
    /// Returns true if the glyph was written. Zero-width graphemes are never
    /// written; a wide glyph is skipped unless both of its cells are inside
    /// the buffer and the clip.
    pub fn set_glyph(
        &mut self,
        x: i32,
        y: i32,
        grapheme: &str,
        width: usize,
        style: CellStyle,
        clip: &ClipRect,
    ) -> bool {
        if width == 0 {
            return false;
        }
        let span = width.min(2) as i32;
        for dx in 0..span {
            if !self.in_bounds(x + dx, y) || !clip.contains(x + dx, y) {
                return false;
            }
        }
        let (col, row) = (x as u16, y as u16);

        self.break_wide_pair(col, row);
        if span == 2 {
            self.break_wide_pair(col + 1, row);
        }

        let head = self.styled(col, row, Glyph::from_grapheme(grapheme), style);
        let idx = self.index(col, row);
        self.cells[idx] = head;
        if span == 2 {
            let tail = self.styled(col + 1, row, Glyph::Continuation, style);
            let idx = self.index(col + 1, row);
            self.cells[idx] = tail;
        }
        true
    }

    /// Build a cell for (x, y), keeping the existing background when the
    /// style's background is the terminal default.
    fn styled(&self, x: u16, y: u16, glyph: Glyph, style: CellStyle) -> Cell {
        let existing_bg = self.cells[self.index(x, y)].bg;
        let bg = if style.bg.is_terminal_default() {
            existing_bg
        } else {
            style.bg
        };
        Cell {
            glyph,
            fg: style.fg,
            bg,
            attrs: style.attrs,
        }
    }

    /// About to overwrite (x, y): blank whichever half of a wide pair would
    /// be orphaned.
    fn break_wide_pair(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].glyph.is_continuation() {
            if x > 0 {
                self.cells[idx - 1].glyph = Glyph::BLANK;
            }
            self.cells[idx].glyph = Glyph::BLANK;
        } else if x + 1 < self.width && self.cells[idx + 1].glyph.is_continuation() {
            self.cells[idx + 1].glyph = Glyph::BLANK;
        }
    }

    /// Fill a rectangle with blank cells of the given background.
    pub fn fill_rect(&mut self, rect: &ClipRect, bg: Rgba, clip: &ClipRect) {
        let Some(area) = rect.intersect(clip).and_then(|r| r.intersect(&self.bounds())) else {
            return;
        };
        let (x1, y1) = (area.x as u16, area.y as u16);
        let x2 = x1 + area.width;

        for row in y1..y1 + area.height {
            self.break_wide_pair(x1, row);
            if x2 < self.width {
                self.break_wide_pair(x2, row);
            }
            let start = self.index(x1, row);
            let end = self.index(x2, row);
            for cell in &mut self.cells[start..end] {
                cell.glyph = Glyph::BLANK;
                cell.bg = bg;
                cell.attrs = Attr::NONE;
            }
        }
    }

    /// Draw a border along the edges of `rect` for the given sides.
    ///
    /// Corners are drawn only where both adjoining sides are present; a
    /// missing side lets the neighbouring edges run to the rectangle's end.
    pub fn draw_border(
        &mut self,
        rect: &ClipRect,
        border: BorderStyle,
        sides: Sides,
        style: CellStyle,
        clip: &ClipRect,
    ) {
        if !border.is_visible() || rect.width == 0 || rect.height == 0 {
            return;
        }
        let chars = border.chars();
        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.right() - 1, rect.bottom() - 1);
        let top = sides.contains(Sides::TOP);
        let bottom = sides.contains(Sides::BOTTOM);
        let left = sides.contains(Sides::LEFT);
        let right = sides.contains(Sides::RIGHT);

        let put = |buf: &mut Self, x: i32, y: i32, c: char| {
            let mut tmp = [0u8; 4];
            buf.set_glyph(x, y, c.encode_utf8(&mut tmp), 1, style, clip);
        };

        let inner_x1 = if left { x1 + 1 } else { x1 };
        let inner_x2 = if right { x2 - 1 } else { x2 };
        let inner_y1 = if top { y1 + 1 } else { y1 };
        let inner_y2 = if bottom { y2 - 1 } else { y2 };

        if top {
            for x in inner_x1..=inner_x2 {
                put(self, x, y1, chars.horizontal);
            }
        }
        if bottom {
            for x in inner_x1..=inner_x2 {
                put(self, x, y2, chars.horizontal);
            }
        }
        if left {
            for y in inner_y1..=inner_y2 {
                put(self, x1, y, chars.vertical);
            }
        }
        if right {
            for y in inner_y1..=inner_y2 {
                put(self, x2, y, chars.vertical);
            }
        }

        if top && left {
            put(self, x1, y1, chars.top_left);
        }
        if top && right {
            put(self, x2, y1, chars.top_right);
        }
        if bottom && right {
            put(self, x2, y2, chars.bottom_right);
        }
        if bottom && left {
            put(self, x1, y2, chars.bottom_left);
        }
    }

    /// Copy rows of `other` into this buffer starting at row `y`.
    pub fn blit_rows(&mut self, other: &FrameBuffer, y: u16) {
        let width = self.width.min(other.width) as usize;
        for (dy, src) in other.rows().enumerate() {
            let row = y as usize + dy;
            if row >= self.height as usize {
                break;
            }
            let start = row * self.width as usize;
            self.cells[start..start + width].clone_from_slice(&src[..width]);
        }
    }

    // =========================================================================
    // Text Export
    // =========================================================================

    /// The visible text of row `y`, including trailing blanks.
    pub fn row_text(&self, y: u16) -> String {
        let mut out = String::with_capacity(self.width as usize);
        for cell in self.row(y) {
            cell.glyph.push_to(&mut out);
        }
        out
    }

    /// Every row as plain text with trailing whitespace trimmed.
    pub fn to_plain_lines(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| self.row_text(y).trim_end().to_string())
            .collect()
    }
}
