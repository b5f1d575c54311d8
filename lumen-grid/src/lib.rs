//! Lumen Grid - Read-only terminal grid model consumed by the renderer.
//!
//! The terminal state machine that produces this data lives elsewhere.
//! This crate only describes what a renderer may read from it: cells,
//! attributes, cursor, scrollback position, and the current selection.

mod cell;
mod grid;
mod snapshot;

pub use cell::{Cell, CellFlags, Color};
pub use grid::{GridError, TerminalGrid};
pub use snapshot::{CursorPosition, GridSnapshot, SelectionRange};

/// Default terminal dimensions.
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;
