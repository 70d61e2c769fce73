//! Framebuffer snapshot model.

use serde::{Deserialize, Serialize};

/// A single terminal cell: a character plus the few renditions the client
/// needs for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub ch: char,
    pub underline: bool,
    pub dim: bool,
    pub reverse: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            underline: false,
            dim: false,
            reverse: false,
        }
    }
}

impl Cell {
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            ..Self::default()
        }
    }
}

/// An immutable-per-frame grid of terminal cells plus dimensions and cursor.
///
/// The controller holds exactly two of these (`displayed` and a scratch
/// buffer) and exchanges them by swap, never by copy.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framebuffer {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
    pub cursor_col: u16,
    pub cursor_row: u16,
    pub title: Option<String>,
}

impl Clone for Framebuffer {
    fn clone(&self) -> Self {
        Self {
            cols: self.cols,
            rows: self.rows,
            cells: self.cells.clone(),
            cursor_col: self.cursor_col,
            cursor_row: self.cursor_row,
            title: self.title.clone(),
        }
    }

    // Field-wise so `cells` keeps its allocation when capacity suffices;
    // the controller's double-buffer swap depends on this.
    fn clone_from(&mut self, source: &Self) {
        self.cols = source.cols;
        self.rows = source.rows;
        self.cells.clone_from(&source.cells);
        self.cursor_col = source.cursor_col;
        self.cursor_row = source.cursor_row;
        self.title.clone_from(&source.title);
    }
}

impl Framebuffer {
    pub fn new(cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols as usize * rows as usize],
            cursor_col: 0,
            cursor_row: 0,
            title: None,
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// A full row of cells. Rows compare with `==` for diffing.
    pub fn row(&self, row: u16) -> &[Cell] {
        let start = row as usize * self.cols as usize;
        &self.cells[start..start + self.cols as usize]
    }

    pub fn get(&self, col: u16, row: u16) -> Option<&Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(&self.cells[row as usize * self.cols as usize + col as usize])
    }

    pub fn set(&mut self, col: u16, row: u16, cell: Cell) {
        if col < self.cols && row < self.rows {
            self.cells[row as usize * self.cols as usize + col as usize] = cell;
        }
    }

    /// Write text into a row starting at `col`, clipped at the right edge.
    /// `template` supplies the renditions for every written cell.
    pub fn write_text(&mut self, row: u16, col: u16, text: &str, template: Cell) {
        let mut c = col;
        for ch in text.chars() {
            if c >= self.cols {
                break;
            }
            self.set(c, row, Cell { ch, ..template });
            c += 1;
        }
    }

    /// Fill an entire row with copies of `template`.
    pub fn fill_row(&mut self, row: u16, template: Cell) {
        if row >= self.rows {
            return;
        }
        let start = row as usize * self.cols as usize;
        for cell in &mut self.cells[start..start + self.cols as usize] {
            *cell = template;
        }
    }

    /// Resize in place, preserving the overlapping region.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cols && rows == self.rows {
            return;
        }
        let mut cells = vec![Cell::default(); cols as usize * rows as usize];
        for r in 0..rows.min(self.rows) {
            for c in 0..cols.min(self.cols) {
                cells[r as usize * cols as usize + c as usize] =
                    self.cells[r as usize * self.cols as usize + c as usize];
            }
        }
        self.cells = cells;
        self.cols = cols;
        self.rows = rows;
        self.cursor_col = self.cursor_col.min(cols - 1);
        self.cursor_row = self.cursor_row.min(rows - 1);
    }
}
