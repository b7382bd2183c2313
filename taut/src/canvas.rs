// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text canvas for assertion failure diagrams.
//!
//! A 2-D grid of codepoints with a per-cell style, used to render the
//! assertion failure diagram: the expression line, downward "drop lines",
//! value boxes, and overline brackets. Growing the grid, finding free
//! space for a new value box, and drawing brackets with side "tails" are
//! all implemented here; styling to actual ANSI escapes happens only in
//! [`Canvas::render`], via `owo-colors`.

use owo_colors::{OwoColorize, Style};

/// A fixed palette cycled through for successive captured values.
pub const PALETTE: &[u8] = &[
    arg_palette::CYAN,
    arg_palette::MAGENTA,
    arg_palette::YELLOW,
    arg_palette::GREEN,
    arg_palette::BLUE,
    arg_palette::RED,
];

mod arg_palette {
    pub const CYAN: u8 = 6;
    pub const MAGENTA: u8 = 5;
    pub const YELLOW: u8 = 3;
    pub const GREEN: u8 = 2;
    pub const BLUE: u8 = 4;
    pub const RED: u8 = 1;
}

/// Per-cell metadata: whether a cell is load-bearing for layout purposes
/// ([`CellInfo::important`]) and which palette slot, if any, colors it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CellInfo {
    pub important: bool,
    pub color: Option<u8>,
    pub dim: bool,
}

impl CellInfo {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn important() -> Self {
        Self {
            important: true,
            ..Self::default()
        }
    }

    pub fn colored(palette_index: usize) -> Self {
        Self {
            important: true,
            color: Some(PALETTE[palette_index % PALETTE.len()]),
            dim: false,
        }
    }

    pub fn dimmed() -> Self {
        Self {
            important: false,
            color: None,
            dim: true,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Cell {
    ch: char,
    info: CellInfo,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            info: CellInfo::default(),
        }
    }
}

/// A 2-D grid of styled codepoints that grows on demand.
///
/// Rows and columns are both zero-indexed; the grid automatically grows
/// (padding with blank cells) to fit whatever is drawn.
#[derive(Default)]
pub struct Canvas {
    rows: Vec<Vec<Cell>>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    fn ensure_row(&mut self, row: usize) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
    }

    fn ensure_cell(&mut self, row: usize, col: usize) {
        self.ensure_row(row);
        let line = &mut self.rows[row];
        if col >= line.len() {
            line.resize_with(col + 1, Cell::default);
        }
    }

    /// Writes `text` starting at `(row, col)`, widening the row as needed.
    /// Returns the column just past the last character written.
    pub fn draw_string(&mut self, row: usize, col: usize, text: &str, info: CellInfo) -> usize {
        let mut c = col;
        for ch in text.chars() {
            self.ensure_cell(row, c);
            self.rows[row][c] = Cell { ch, info };
            c += 1;
        }
        c
    }

    /// Draws a filled run of `height` rows at a single column.
    pub fn draw_column(&mut self, col: usize, row_start: usize, height: usize, ch: char, info: CellInfo) {
        for row in row_start..row_start + height {
            self.ensure_cell(row, col);
            let existing = self.rows[row][col];
            if existing.info.important && info.important && existing.ch != ' ' {
                // `skip_important` behavior: never clobber an existing
                // important cell with another important one.
                continue;
            }
            self.rows[row][col] = Cell { ch, info };
        }
    }

    /// Draws a filled run of `width` columns at a single row.
    pub fn draw_row(&mut self, row: usize, col_start: usize, width: usize, ch: char, info: CellInfo, skip_important: bool) {
        for col in col_start..col_start + width {
            self.ensure_cell(row, col);
            if skip_important && self.rows[row][col].info.important {
                continue;
            }
            self.rows[row][col] = Cell { ch, info };
        }
    }

    fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .is_some_and(|c| c.info.important)
    }

    fn rect_is_free(&self, row: usize, col: usize, height: usize, width: usize, gap: usize) -> bool {
        let row_start = row.saturating_sub(gap);
        let row_end = row + height + gap;
        let col_start = col.saturating_sub(gap);
        let col_end = col + width + gap;
        for r in row_start..row_end {
            for c in col_start..col_end {
                if self.is_occupied(r, c) {
                    return false;
                }
            }
        }
        true
    }

    /// Finds the first row at or below `start_row` (advancing by `vstep`
    /// when no free run is found) where a `height x width` rectangle, plus
    /// a `gap`-cell margin, fits without touching an important cell.
    pub fn find_free_space(
        &self,
        start_row: usize,
        col: usize,
        height: usize,
        width: usize,
        gap: usize,
        vstep: usize,
    ) -> usize {
        let mut row = start_row;
        loop {
            if self.rect_is_free(row, col, height, width, gap) {
                return row;
            }
            row += vstep.max(1);
        }
    }

    /// Draws a horizontal bracket over `[col_start, col_start+width)` at
    /// `row`, with a downward "tail" of `tail_height` rows centered at
    /// `tail_col` (defaults to the bracket's midpoint when `None`).
    pub fn draw_hor_bracket(
        &mut self,
        row: usize,
        col_start: usize,
        width: usize,
        tail_col: Option<usize>,
        tail_height: usize,
        info: CellInfo,
    ) {
        if width == 0 {
            return;
        }
        self.draw_row(row, col_start, width, '\u{2500}', info, false);
        self.ensure_cell(row, col_start);
        self.rows[row][col_start] = Cell { ch: '\u{256D}', info };
        let last_col = col_start + width - 1;
        self.ensure_cell(row, last_col);
        self.rows[row][last_col] = Cell { ch: '\u{256E}', info };
        let tail_col = tail_col.unwrap_or(col_start + width / 2);
        self.draw_column(tail_col, row + 1, tail_height, '\u{2502}', info);
    }

    /// Draws an overline labeled with `label`, used to mark the narrowest
    /// in-progress subexpression in a failure diagram.
    pub fn draw_overline(&mut self, row: usize, col_start: usize, width: usize, label: &str, info: CellInfo) {
        self.draw_row(row, col_start, width, '\u{2500}', info, false);
        let label_col = col_start + width.saturating_sub(label.chars().count()) / 2;
        self.draw_string(row + 1, label_col, label, info);
    }

    /// Renders the canvas to a string, applying ANSI styling for colored
    /// cells and a single trailing newline per row; styling is a no-op
    /// when `color` is `false`.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        for line in &self.rows {
            let mut current_style: Option<CellInfo> = None;
            let mut run = String::new();
            let flush = |out: &mut String, run: &mut String, style: Option<CellInfo>| {
                if run.is_empty() {
                    return;
                }
                if color {
                    if let Some(info) = style {
                        let styled = apply_style(run, info);
                        out.push_str(&styled);
                    } else {
                        out.push_str(run);
                    }
                } else {
                    out.push_str(run);
                }
                run.clear();
            };
            for cell in line {
                if Some(cell.info) != current_style {
                    flush(&mut out, &mut run, current_style);
                    current_style = Some(cell.info);
                }
                run.push(cell.ch);
            }
            flush(&mut out, &mut run, current_style);
            out.push('\n');
        }
        out
    }
}

fn apply_style(text: &str, info: CellInfo) -> String {
    let mut style = Style::new();
    if let Some(color_index) = info.color {
        style = match color_index {
            arg_palette::RED => style.red(),
            arg_palette::GREEN => style.green(),
            arg_palette::YELLOW => style.yellow(),
            arg_palette::BLUE => style.blue(),
            arg_palette::MAGENTA => style.magenta(),
            arg_palette::CYAN => style.cyan(),
            _ => style,
        };
    }
    if info.dim {
        style = style.dimmed();
    }
    text.style(style).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_string_widens_row() {
        let mut canvas = Canvas::new();
        canvas.draw_string(0, 2, "hi", CellInfo::plain());
        assert_eq!(canvas.render(false), "  hi\n");
    }

    #[test]
    fn value_boxes_never_overlap() {
        let mut canvas = Canvas::new();
        canvas.draw_string(0, 0, "aaaa", CellInfo::important());
        let free_row = canvas.find_free_space(1, 0, 1, 4, 1, 1);
        assert!(free_row >= 1);
        canvas.draw_string(free_row, 0, "bbbb", CellInfo::important());
        assert_ne!(free_row, 0);
    }
}
