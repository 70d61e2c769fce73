//! Differential ANSI frame renderer.
//!
//! Keeps a copy of what it believes is on the physical terminal and emits
//! only the escape sequences needed to turn that into the next frame: move
//! the cursor, adjust renditions, rewrite changed cells, update the window
//! title. A full clear happens only on the first frame, after a geometry
//! change, or after [`AnsiDisplay::invalidate`].

use std::fmt::Write as _;
use std::io::{self, Write};

use resh_core::terminal::{Cell, Display, Framebuffer};
use resh_core::{Error, Result};

/// Diff-aware renderer over any byte sink (stdout in production).
pub struct AnsiDisplay<W: Write> {
    out: W,
    /// What we last painted; `None` forces a full redraw.
    local: Option<Framebuffer>,
    /// Physical cursor position, -1 when unknown.
    cursor_col: i32,
    cursor_row: i32,
    rendition: Cell,
    current_title: Option<String>,
}

impl AnsiDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AnsiDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            local: None,
            cursor_col: -1,
            cursor_row: -1,
            rendition: Cell::default(),
            current_title: None,
        }
    }

    /// Escape sequences turning the last-painted frame into `frame`.
    pub fn new_frame(&mut self, frame: &Framebuffer) -> String {
        let mut output = String::new();
        let (cols, rows) = (frame.cols(), frame.rows());

        let initialized = self
            .local
            .as_ref()
            .is_some_and(|local| local.cols() == cols && local.rows() == rows);

        if !initialized {
            // Reset scrolling region and renditions, clear, hide the cursor
            // while we paint.
            output.push_str("\x1b[r\x1b[0m\x1b[H\x1b[2J\x1b[?25l");
            self.cursor_col = 0;
            self.cursor_row = 0;
            self.rendition = Cell::default();
        }

        let old = self.local.take();
        for row in 0..rows {
            let old_row = old.as_ref().filter(|_| initialized).map(|o| o.row(row));
            if let Some(old_row) = old_row {
                if old_row == frame.row(row) {
                    continue;
                }
            }
            self.put_row(&mut output, frame, old_row, row);
        }

        self.append_move(&mut output, frame.cursor_row as i32, frame.cursor_col as i32);
        if self.rendition != Cell::default() {
            output.push_str("\x1b[0m");
            self.rendition = Cell::default();
        }
        output.push_str("\x1b[?25h");

        if frame.title != self.current_title {
            match &frame.title {
                Some(title) => {
                    let _ = write!(output, "\x1b]0;{title}\x07");
                }
                None => output.push_str("\x1b]0;\x07"),
            }
            self.current_title = frame.title.clone();
        }

        self.local = Some(frame.clone());
        output
    }

    fn put_row(
        &mut self,
        output: &mut String,
        frame: &Framebuffer,
        old_row: Option<&[Cell]>,
        row: u16,
    ) {
        let cells = frame.row(row);
        for (col, cell) in cells.iter().enumerate() {
            if let Some(old_row) = old_row {
                if old_row[col] == *cell {
                    continue;
                }
            }

            if self.cursor_col != col as i32 || self.cursor_row != row as i32 {
                self.append_move(output, row as i32, col as i32);
            }
            self.update_rendition(output, cell);
            output.push(cell.ch);
            self.cursor_col = col as i32 + 1;
            if self.cursor_col >= frame.cols() as i32 {
                // The terminal may or may not have wrapped.
                self.cursor_col = -1;
            }
        }
    }

    fn append_move(&mut self, output: &mut String, row: i32, col: i32) {
        let (last_col, last_row) = (self.cursor_col, self.cursor_row);
        self.cursor_col = col;
        self.cursor_row = row;

        if last_col == col && last_row == row {
            return;
        }
        if last_col >= 0 && last_row >= 0 {
            // CR/LF reaches the start of nearby lower rows in fewer bytes
            // than a full cursor-position sequence.
            if col == 0 && row >= last_row && row - last_row < 5 {
                if last_col != 0 {
                    output.push('\r');
                }
                for _ in 0..(row - last_row) {
                    output.push('\n');
                }
                return;
            }
            if row == last_row && col < last_col && last_col - col < 5 {
                for _ in 0..(last_col - col) {
                    output.push('\x08');
                }
                return;
            }
        }
        let _ = write!(output, "\x1b[{};{}H", row + 1, col + 1);
    }

    fn update_rendition(&mut self, output: &mut String, cell: &Cell) {
        let same = self.rendition.underline == cell.underline
            && self.rendition.dim == cell.dim
            && self.rendition.reverse == cell.reverse;
        if same {
            return;
        }

        output.push_str("\x1b[0");
        if cell.dim {
            output.push_str(";2");
        }
        if cell.underline {
            output.push_str(";4");
        }
        if cell.reverse {
            output.push_str(";7");
        }
        output.push('m');
        self.rendition = Cell {
            ch: self.rendition.ch,
            underline: cell.underline,
            dim: cell.dim,
            reverse: cell.reverse,
        };
    }
}

impl<W: Write> Display for AnsiDisplay<W> {
    fn render(&mut self, frame: &Framebuffer) -> Result<()> {
        let output = self.new_frame(frame);
        self.out.write_all(output.as_bytes()).map_err(Error::Io)?;
        self.out.flush().map_err(Error::Io)?;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.local = None;
        self.cursor_col = -1;
        self.cursor_row = -1;
        self.current_title = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> AnsiDisplay<Vec<u8>> {
        AnsiDisplay::new(Vec::new())
    }

    #[test]
    fn first_frame_clears_and_paints() {
        let mut d = display();
        let mut fb = Framebuffer::new(10, 2);
        fb.write_text(0, 0, "hi", Cell::default());
        let out = d.new_frame(&fb);
        assert!(out.starts_with("\x1b[r\x1b[0m\x1b[H\x1b[2J"));
        assert!(out.contains("hi"));
        assert!(out.ends_with("\x1b[?25h"));
    }

    #[test]
    fn unchanged_frame_emits_no_cell_writes() {
        let mut d = display();
        let mut fb = Framebuffer::new(10, 2);
        fb.write_text(0, 0, "hi", Cell::default());
        d.new_frame(&fb);
        let out = d.new_frame(&fb);
        assert!(!out.contains("hi"));
        assert!(!out.contains("\x1b[2J"));
    }

    #[test]
    fn only_changed_cells_are_rewritten() {
        let mut d = display();
        let mut fb = Framebuffer::new(10, 2);
        fb.write_text(0, 0, "hello", Cell::default());
        d.new_frame(&fb);

        fb.set(4, 0, Cell::new('p'));
        let out = d.new_frame(&fb);
        assert!(out.contains('p'));
        assert!(!out.contains("hell"));
    }

    #[test]
    fn geometry_change_forces_full_redraw() {
        let mut d = display();
        d.new_frame(&Framebuffer::new(10, 2));
        let out = d.new_frame(&Framebuffer::new(20, 4));
        assert!(out.contains("\x1b[2J"));
    }

    #[test]
    fn invalidate_forces_full_redraw() {
        let mut d = display();
        let fb = Framebuffer::new(10, 2);
        d.new_frame(&fb);
        d.invalidate();
        let out = d.new_frame(&fb);
        assert!(out.contains("\x1b[2J"));
    }

    #[test]
    fn underlined_cells_switch_renditions() {
        let mut d = display();
        let mut fb = Framebuffer::new(10, 1);
        fb.set(
            0,
            0,
            Cell {
                ch: 'x',
                underline: true,
                dim: false,
                reverse: false,
            },
        );
        let out = d.new_frame(&fb);
        assert!(out.contains("\x1b[0;4m"));
    }

    #[test]
    fn title_emitted_only_on_change() {
        let mut d = display();
        let mut fb = Framebuffer::new(10, 1);
        fb.title = Some("resh".into());
        let out = d.new_frame(&fb);
        assert!(out.contains("\x1b]0;resh\x07"));

        let out = d.new_frame(&fb);
        assert!(!out.contains("\x1b]0;"));

        fb.title = None;
        let out = d.new_frame(&fb);
        assert!(out.contains("\x1b]0;\x07"));
    }

    #[test]
    fn render_writes_to_the_sink() {
        let mut d = display();
        let fb = Framebuffer::new(5, 1);
        d.render(&fb).unwrap();
        assert!(!d.out.is_empty());
    }
}
