//! Read-only view of a terminal grid.
//!
//! Renderers borrow a `GridSnapshot` for the duration of one frame and never
//! mutate it. Lines are addressed absolutely: line 0 is the oldest scrollback
//! line, and `display_offset()` is the first line shown in the viewport.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Cursor location in absolute line coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub col: usize,
    pub line: usize,
}

impl CursorPosition {
    pub fn new(col: usize, line: usize) -> Self {
        Self { col, line }
    }
}

/// Read access to the visible portion of a terminal.
pub trait GridSnapshot {
    /// Number of columns per line.
    fn cols(&self) -> usize;

    /// Number of lines that fit in the viewport.
    fn screen_rows(&self) -> usize;

    /// Total lines held (scrollback + screen).
    fn total_lines(&self) -> usize;

    /// Absolute index of the first line shown in the viewport.
    fn display_offset(&self) -> usize;

    /// Cell at an absolute line and column, if in range.
    fn cell(&self, line: usize, col: usize) -> Option<&Cell>;

    /// Cursor position (absolute line).
    fn cursor(&self) -> CursorPosition;

    /// Whether the emulator wants the cursor shown.
    fn cursor_visible(&self) -> bool;

    /// Absolute line range currently in the viewport.
    fn visible_lines(&self) -> Range<usize> {
        let start = self.display_offset().min(self.total_lines());
        let end = (start + self.screen_rows()).min(self.total_lines());
        start..end
    }
}

/// A selection between two cells, inclusive on both ends.
///
/// `start` and `end` may be given in either order; `normalized()` returns
/// them in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: CursorPosition,
    pub end: CursorPosition,
}

impl SelectionRange {
    pub fn new(start: CursorPosition, end: CursorPosition) -> Self {
        Self { start, end }
    }

    /// Start and end in reading order (top-left first).
    pub fn normalized(&self) -> (CursorPosition, CursorPosition) {
        let a = self.start;
        let b = self.end;
        if (a.line, a.col) <= (b.line, b.col) {
            (a, b)
        } else {
            (b, a)
        }
    }
}
