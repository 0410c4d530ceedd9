//! A small VT screen model for replaying what an instance wrote.
//!
//! Understands the subset the renderers emit: printable text, CR/LF,
//! cursor addressing (CUP, CUU, CUD, CHA), EL, ED, the alternate screen and
//! SGR (ignored). Lines scrolled off the top land in `scrollback`.

#![allow(dead_code)]

use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone)]
struct Grid {
    cells: Vec<Vec<String>>,
    row: usize,
    col: usize,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![" ".to_string(); width]; height],
            row: 0,
            col: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    width: usize,
    height: usize,
    main: Grid,
    alt: Option<Grid>,
    pub scrollback: Vec<String>,
    pub cursor_visible: bool,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width as usize,
            height: height as usize,
            main: Grid::new(width as usize, height as usize),
            alt: None,
            scrollback: Vec::new(),
            cursor_visible: true,
        }
    }

    /// Convenience: replay `output` on a fresh screen.
    pub fn replay(width: u16, height: u16, output: &str) -> Self {
        let mut screen = Self::new(width, height);
        screen.feed(output);
        screen
    }

    pub fn in_alt_screen(&self) -> bool {
        self.alt.is_some()
    }

    pub fn cursor(&self) -> (usize, usize) {
        let grid = self.grid();
        (grid.col, grid.row)
    }

    fn grid(&self) -> &Grid {
        self.alt.as_ref().unwrap_or(&self.main)
    }

    fn grid_mut(&mut self) -> &mut Grid {
        match self.alt.as_mut() {
            Some(alt) => alt,
            None => &mut self.main,
        }
    }

    /// Visible rows with trailing spaces removed.
    pub fn lines(&self) -> Vec<String> {
        self.grid()
            .cells
            .iter()
            .map(|row| row.concat().trim_end().to_string())
            .collect()
    }

    /// Visible rows joined with `\n`, trailing empty rows dropped.
    pub fn text(&self) -> String {
        let mut lines = self.lines();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Scrollback followed by the visible text.
    pub fn history(&self) -> String {
        let mut all = self.scrollback.clone();
        all.extend(self.lines());
        while all.last().is_some_and(|l| l.is_empty()) {
            all.pop();
        }
        all.join("\n")
    }

    pub fn feed(&mut self, output: &str) {
        let mut chars = output.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => match chars.next() {
                    Some('[') => {
                        let mut params = String::new();
                        let mut final_byte = None;
                        for c in chars.by_ref() {
                            if ('\x40'..='\x7e').contains(&c) {
                                final_byte = Some(c);
                                break;
                            }
                            params.push(c);
                        }
                        if let Some(f) = final_byte {
                            self.csi(&params, f);
                        }
                    }
                    Some(_) | None => {}
                },
                '\r' => self.grid_mut().col = 0,
                '\n' => self.line_feed(),
                c if c.is_control() => {}
                c => self.print(c),
            }
        }
    }

    fn print(&mut self, c: char) {
        let w = c.width().unwrap_or(0);
        if w == 0 {
            return;
        }
        let width = self.width;
        let grid = self.grid_mut();
        if grid.col + w > width {
            return;
        }
        let row = grid.row;
        let col = grid.col;
        grid.cells[row][col] = c.to_string();
        for extra in 1..w {
            grid.cells[row][col + extra] = String::new();
        }
        grid.col += w;
    }

    fn line_feed(&mut self) {
        let width = self.width;
        let height = self.height;
        let in_alt = self.alt.is_some();
        let grid = self.grid_mut();
        if grid.row + 1 < height {
            grid.row += 1;
            return;
        }
        let top = grid.cells.remove(0);
        grid.cells.push(vec![" ".to_string(); width]);
        if !in_alt {
            self.scrollback.push(top.concat().trim_end().to_string());
        }
    }

    fn csi(&mut self, params: &str, final_byte: char) {
        if let Some(private) = params.strip_prefix('?') {
            let set = final_byte == 'h';
            match (private, set) {
                ("1049", true) => {
                    self.alt = Some(Grid::new(self.width, self.height));
                }
                ("1049", false) => self.alt = None,
                ("25", visible) => self.cursor_visible = visible,
                _ => {}
            }
            return;
        }

        let nums: Vec<usize> = params
            .split(';')
            .map(|p| p.parse().unwrap_or(0))
            .collect();
        let n = |i: usize, default: usize| nums.get(i).copied().filter(|&v| v > 0).unwrap_or(default);
        let (width, height) = (self.width, self.height);
        let grid = self.grid_mut();

        match final_byte {
            'H' => {
                grid.row = (n(0, 1) - 1).min(height - 1);
                grid.col = (n(1, 1) - 1).min(width - 1);
            }
            'A' => grid.row = grid.row.saturating_sub(n(0, 1)),
            'B' => grid.row = (grid.row + n(0, 1)).min(height - 1),
            'G' => grid.col = (n(0, 1) - 1).min(width - 1),
            'K' => {
                let row = grid.row;
                for cell in &mut grid.cells[row][grid.col..] {
                    *cell = " ".to_string();
                }
            }
            'J' => match nums.first().copied().unwrap_or(0) {
                2 => {
                    for row in &mut grid.cells {
                        row.iter_mut().for_each(|c| *c = " ".to_string());
                    }
                }
                _ => {
                    let (row, col) = (grid.row, grid.col);
                    for cell in &mut grid.cells[row][col..] {
                        *cell = " ".to_string();
                    }
                    for r in &mut grid.cells[row + 1..] {
                        r.iter_mut().for_each(|c| *c = " ".to_string());
                    }
                }
            },
            _ => {}
        }
    }
}

/// Whether `s` contains any escape sequence.
pub fn has_escapes(s: &str) -> bool {
    s.contains('\x1b')
}
