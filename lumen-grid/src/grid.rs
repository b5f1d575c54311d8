//! Terminal grid - a 2D array of cells with scrollback.

use thiserror::Error;

use crate::cell::Cell;
use crate::snapshot::{CursorPosition, GridSnapshot};

/// Errors from grid mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("invalid grid size: {cols}x{rows}")]
    InvalidSize { cols: u16, rows: u16 },
}

/// A terminal grid containing lines of cells.
///
/// Holds `total_lines` lines, of which `screen_rows` are visible starting at
/// `display_offset`. Line 0 is the oldest scrollback line.
#[derive(Debug, Clone)]
pub struct TerminalGrid {
    /// The cells, stored line-major.
    cells: Vec<Cell>,
    /// Number of columns.
    cols: u16,
    /// Number of lines held (scrollback + screen).
    total_lines: usize,
    /// Number of lines in the viewport.
    screen_rows: u16,
    /// First line shown in the viewport.
    display_offset: usize,
    /// Cursor position (column).
    cursor_col: usize,
    /// Cursor position (absolute line).
    cursor_line: usize,
    /// Whether cursor is visible.
    cursor_visible: bool,
}

impl TerminalGrid {
    /// Create a new grid with the given dimensions and no scrollback.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_scrollback(cols, rows, 0)
    }

    /// Create a grid with `history` lines of scrollback above the screen.
    ///
    /// The viewport starts scrolled to the bottom.
    pub fn with_scrollback(cols: u16, rows: u16, history: usize) -> Self {
        let total_lines = rows as usize + history;
        Self {
            cells: vec![Cell::default(); cols as usize * total_lines],
            cols,
            total_lines,
            screen_rows: rows,
            display_offset: history,
            cursor_col: 0,
            cursor_line: history,
            cursor_visible: true,
        }
    }

    /// Get the viewport dimensions (cols, rows).
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.screen_rows)
    }

    #[inline]
    fn index(&self, line: usize, col: usize) -> Option<usize> {
        (col < self.cols as usize && line < self.total_lines)
            .then(|| line * self.cols as usize + col)
    }

    /// Get a cell at an absolute line and column.
    pub fn get(&self, line: usize, col: usize) -> Option<&Cell> {
        self.index(line, col).and_then(|idx| self.cells.get(idx))
    }

    /// Set a cell at an absolute line and column. Out-of-range writes are ignored.
    pub fn set(&mut self, line: usize, col: usize, cell: Cell) {
        if let Some(idx) = self.index(line, col) {
            self.cells[idx] = cell;
        }
    }

    /// Write a string starting at (line, col), one char per cell, clipped at the line end.
    pub fn write_str(&mut self, line: usize, col: usize, text: &str, template: Cell) {
        for (offset, c) in text.chars().enumerate() {
            self.set(line, col + offset, Cell { c, ..template });
        }
    }

    /// Set the cursor position, clamped to the grid.
    pub fn set_cursor(&mut self, col: usize, line: usize) {
        self.cursor_col = col.min((self.cols as usize).saturating_sub(1));
        self.cursor_line = line.min(self.total_lines.saturating_sub(1));
    }

    /// Set cursor visibility.
    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    /// Scroll the viewport so `offset` is its first line, clamped so the
    /// viewport never runs past the last line.
    pub fn scroll_to(&mut self, offset: usize) {
        let max = self.total_lines.saturating_sub(self.screen_rows as usize);
        self.display_offset = offset.min(max);
    }

    /// Resize the viewport, preserving content where possible.
    ///
    /// Scrollback length is kept; lines are truncated or padded to the new width.
    pub fn resize(&mut self, new_cols: u16, new_rows: u16) -> Result<(), GridError> {
        if new_cols == 0 || new_rows == 0 {
            return Err(GridError::InvalidSize { cols: new_cols, rows: new_rows });
        }

        let history = self.total_lines - self.screen_rows as usize;
        let new_total = history + new_rows as usize;
        let mut new_cells = vec![Cell::default(); new_cols as usize * new_total];

        let copy_cols = self.cols.min(new_cols) as usize;
        let copy_lines = self.total_lines.min(new_total);

        for line in 0..copy_lines {
            let old_start = line * self.cols as usize;
            let new_start = line * new_cols as usize;
            new_cells[new_start..new_start + copy_cols]
                .copy_from_slice(&self.cells[old_start..old_start + copy_cols]);
        }

        self.cells = new_cells;
        self.cols = new_cols;
        self.screen_rows = new_rows;
        self.total_lines = new_total;
        self.display_offset = self.display_offset.min(history);
        self.set_cursor(self.cursor_col, self.cursor_line);
        Ok(())
    }

    /// Iterate over all lines, oldest first.
    pub fn lines_iter(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.cols.max(1) as usize)
    }

    /// Extract visible text content (for debugging/search).
    pub fn visible_text(&self) -> String {
        let mut result = String::new();
        for line in self.visible_lines() {
            for col in 0..self.cols as usize {
                let c = self.get(line, col).map_or(' ', |cell| cell.c);
                result.push(if c == '\0' { ' ' } else { c });
            }
            result.push('\n');
        }
        result
    }
}

impl Default for TerminalGrid {
    fn default() -> Self {
        Self::new(crate::DEFAULT_COLS, crate::DEFAULT_ROWS)
    }
}

impl GridSnapshot for TerminalGrid {
    fn cols(&self) -> usize {
        self.cols as usize
    }

    fn screen_rows(&self) -> usize {
        self.screen_rows as usize
    }

    fn total_lines(&self) -> usize {
        self.total_lines
    }

    fn display_offset(&self) -> usize {
        self.display_offset
    }

    fn cell(&self, line: usize, col: usize) -> Option<&Cell> {
        self.get(line, col)
    }

    fn cursor(&self) -> CursorPosition {
        CursorPosition::new(self.cursor_col, self.cursor_line)
    }

    fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Color;

    #[test]
    fn test_new_grid_viewport() {
        let grid = TerminalGrid::new(10, 4);
        assert_eq!(grid.size(), (10, 4));
        assert_eq!(grid.visible_lines(), 0..4);
        assert_eq!(grid.total_lines(), 4);
    }

    #[test]
    fn test_scrollback_starts_at_bottom() {
        let grid = TerminalGrid::with_scrollback(10, 4, 6);
        assert_eq!(grid.total_lines(), 10);
        assert_eq!(grid.display_offset(), 6);
        assert_eq!(grid.visible_lines(), 6..10);
        assert_eq!(grid.cursor(), CursorPosition::new(0, 6));
    }

    #[test]
    fn test_scroll_to_clamps() {
        let mut grid = TerminalGrid::with_scrollback(10, 4, 6);
        grid.scroll_to(2);
        assert_eq!(grid.visible_lines(), 2..6);
        grid.scroll_to(100);
        assert_eq!(grid.display_offset(), 6);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut grid = TerminalGrid::new(3, 2);
        assert!(grid.get(2, 0).is_none());
        assert!(grid.get(0, 3).is_none());
        grid.set(5, 5, Cell::new('x'));
        assert!(grid.lines_iter().flatten().all(|c| c.c == '\0'));
    }

    #[test]
    fn test_write_str_clips() {
        let mut grid = TerminalGrid::new(4, 1);
        grid.write_str(0, 2, "hello", Cell::default());
        assert_eq!(grid.visible_text(), "  he\n");
    }

    #[test]
    fn test_resize_preserves_content() {
        let mut grid = TerminalGrid::new(4, 2);
        grid.write_str(0, 0, "abcd", Cell::default().with_bg(Color::Indexed(2)));
        grid.resize(2, 3).unwrap();
        assert_eq!(grid.size(), (2, 3));
        assert_eq!(grid.get(0, 1).map(|c| c.c), Some('b'));
        assert_eq!(grid.get(0, 1).map(|c| c.bg), Some(Color::Indexed(2)));
        assert_eq!(grid.get(2, 0).map(|c| c.c), Some('\0'));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut grid = TerminalGrid::new(4, 2);
        assert_eq!(
            grid.resize(0, 5),
            Err(GridError::InvalidSize { cols: 0, rows: 5 })
        );
        assert_eq!(grid.size(), (4, 2));
    }

    #[test]
    fn test_cursor_clamped() {
        let mut grid = TerminalGrid::new(4, 2);
        grid.set_cursor(10, 10);
        assert_eq!(grid.cursor(), CursorPosition::new(3, 1));
    }
}
