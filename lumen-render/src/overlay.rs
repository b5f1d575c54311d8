//! Cursor and selection overlays, in physical pixels.

use lumen_grid::{GridSnapshot, SelectionRange};

use crate::config::CursorConfig;
use crate::geometry::CellMetrics;
use crate::types::{CursorRenderInfo, SelectionRect};

/// Cursor quad for this frame.
///
/// `visible` is false when the cursor is switched off in `settings`, hidden
/// by the emulator, or scrolled out of the viewport.
pub fn cursor_overlay<G: GridSnapshot + ?Sized>(
    grid: &G,
    metrics: CellMetrics,
    settings: &CursorConfig,
) -> CursorRenderInfo {
    let cursor = grid.cursor();
    let lines = grid.visible_lines();
    let on_screen = lines.contains(&cursor.line) && cursor.col < grid.cols();
    let visible = settings.visible && grid.cursor_visible() && on_screen;

    let [cell_w, cell_h] = metrics.physical_size();
    let position = if visible {
        [
            cursor.col as f32 * cell_w,
            (cursor.line - lines.start) as f32 * cell_h,
        ]
    } else {
        [0.0, 0.0]
    };

    CursorRenderInfo {
        position,
        color: settings.color,
        style: settings.style,
        visible,
    }
}

/// One rect per selected viewport row.
///
/// The first row starts at the selection's start column, the last row ends
/// at its end column (inclusive), and rows in between span the full width.
/// Rows outside the viewport produce nothing.
pub fn selection_rects<G: GridSnapshot + ?Sized>(
    grid: &G,
    selection: &SelectionRange,
    metrics: CellMetrics,
) -> Vec<SelectionRect> {
    let cols = grid.cols();
    let lines = grid.visible_lines();
    if cols == 0 || lines.is_empty() {
        return Vec::new();
    }

    let (start, end) = selection.normalized();
    let first = start.line.max(lines.start);
    let last = end.line.min(lines.end - 1);
    if first > last {
        return Vec::new();
    }

    let [cell_w, cell_h] = metrics.physical_size();
    (first..=last)
        .filter_map(|line| {
            let col_start = if line == start.line { start.col } else { 0 };
            let col_end = if line == end.line { end.col } else { cols - 1 };
            let col_end = col_end.min(cols - 1);
            if col_start > col_end {
                return None;
            }
            Some(SelectionRect::new(
                col_start as f32 * cell_w,
                (line - lines.start) as f32 * cell_h,
                (col_end - col_start + 1) as f32 * cell_w,
                cell_h,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CursorStyle;
    use lumen_grid::{CursorPosition, TerminalGrid};

    fn metrics() -> CellMetrics {
        CellMetrics::new(10.0, 20.0, 1.0)
    }

    fn range(start: (usize, usize), end: (usize, usize)) -> SelectionRange {
        SelectionRange::new(
            CursorPosition::new(start.0, start.1),
            CursorPosition::new(end.0, end.1),
        )
    }

    #[test]
    fn test_single_line_selection() {
        let grid = TerminalGrid::new(80, 24);
        let rects = selection_rects(&grid, &range((2, 3), (5, 3)), metrics());
        assert_eq!(rects, vec![SelectionRect::new(20.0, 60.0, 40.0, 20.0)]);
    }

    #[test]
    fn test_multi_line_selection() {
        let grid = TerminalGrid::new(80, 24);
        let rects = selection_rects(&grid, &range((70, 1), (4, 3)), metrics());
        assert_eq!(
            rects,
            vec![
                SelectionRect::new(700.0, 20.0, 100.0, 20.0),
                SelectionRect::new(0.0, 40.0, 800.0, 20.0),
                SelectionRect::new(0.0, 60.0, 50.0, 20.0),
            ]
        );
    }

    #[test]
    fn test_reversed_selection_is_normalized() {
        let grid = TerminalGrid::new(80, 24);
        let forward = selection_rects(&grid, &range((70, 1), (4, 3)), metrics());
        let backward = selection_rects(&grid, &range((4, 3), (70, 1)), metrics());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_selection_clipped_to_viewport() {
        let grid = TerminalGrid::new(80, 24);
        let rects = selection_rects(&grid, &range((5, 20), (9, 40)), metrics());
        assert_eq!(rects.len(), 4);
        assert_eq!(rects[0], SelectionRect::new(50.0, 400.0, 750.0, 20.0));
        // The end row is off screen, so the last visible row is full width.
        assert_eq!(rects[3], SelectionRect::new(0.0, 460.0, 800.0, 20.0));
    }

    #[test]
    fn test_selection_entirely_off_screen() {
        let mut grid = TerminalGrid::with_scrollback(80, 24, 100);
        assert!(selection_rects(&grid, &range((0, 0), (10, 5)), metrics()).is_empty());
        grid.scroll_to(0);
        let rects = selection_rects(&grid, &range((0, 0), (10, 5)), metrics());
        assert_eq!(rects.len(), 6);
    }

    #[test]
    fn test_selection_end_column_clamped() {
        let grid = TerminalGrid::new(10, 2);
        let rects = selection_rects(&grid, &range((8, 0), (50, 0)), metrics());
        assert_eq!(rects, vec![SelectionRect::new(80.0, 0.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_cursor_position_and_visibility() {
        let mut grid = TerminalGrid::with_scrollback(80, 24, 10);
        grid.set_cursor(4, 12);
        let settings = CursorConfig::default();

        let cursor = cursor_overlay(&grid, metrics(), &settings);
        assert!(cursor.visible);
        assert_eq!(cursor.position, [40.0, 40.0]);
        assert_eq!(cursor.style, CursorStyle::Block);
        assert_eq!(cursor.color, [1.0, 1.0, 1.0, 0.8]);

        grid.set_cursor_visible(false);
        assert!(!cursor_overlay(&grid, metrics(), &settings).visible);
        grid.set_cursor_visible(true);

        let hidden = CursorConfig { visible: false, ..CursorConfig::default() };
        assert!(!cursor_overlay(&grid, metrics(), &hidden).visible);
    }

    #[test]
    fn test_cursor_scrolled_out_of_view() {
        let mut grid = TerminalGrid::with_scrollback(80, 24, 50);
        grid.set_cursor(0, 60);
        grid.scroll_to(0);
        assert!(!cursor_overlay(&grid, metrics(), &CursorConfig::default()).visible);
    }
}
