//! Per-frame instance generation.
//!
//! Walks the visible lines of a `GridSnapshot` and produces one
//! `GlyphInstance` per cell that has something to draw.

use lumen_grid::{Color, GridSnapshot};
use tracing::debug;

use crate::atlas::GlyphAtlas;
use crate::color::{ColorMapper, PaletteColorMapper};
use crate::types::{FontVariant, GlyphInstance, StyleFlags};

/// Cell size in logical pixels plus the display scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl CellMetrics {
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self { width, height, scale_factor }
    }

    /// Cell size in physical pixels.
    #[inline]
    pub fn physical_size(&self) -> [f32; 2] {
        [self.width * self.scale_factor, self.height * self.scale_factor]
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new(8.0, 16.0, 1.0)
    }
}

/// Builds the instance array for a frame, reusing its allocation.
pub struct FrameBuilder {
    instances: Vec<GlyphInstance>,
    max_instances: usize,
    color_mapper: Box<dyn ColorMapper>,
}

impl FrameBuilder {
    pub fn new(max_instances: usize) -> Self {
        Self {
            instances: Vec::new(),
            max_instances,
            color_mapper: Box::new(PaletteColorMapper::default()),
        }
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Replace the color mapper used for every resolution.
    pub fn set_color_mapper(&mut self, mapper: impl ColorMapper + 'static) {
        self.color_mapper = Box::new(mapper);
    }

    /// Instances from the last `build_frame`.
    pub fn instances(&self) -> &[GlyphInstance] {
        &self.instances
    }

    /// Generate instances for every visible, non-empty cell.
    ///
    /// Cells that are blank with the default background are skipped. Output
    /// stops at `max_instances`; the remainder of the grid is not drawn.
    pub fn build_frame<G: GridSnapshot + ?Sized>(
        &mut self,
        grid: &G,
        atlas: &mut GlyphAtlas,
        metrics: CellMetrics,
    ) -> &[GlyphInstance] {
        self.instances.clear();

        let [cell_w, cell_h] = metrics.physical_size();
        let cols = grid.cols();

        'lines: for (screen_row, line) in grid.visible_lines().enumerate() {
            let y = screen_row as f32 * cell_h;
            for col in 0..cols {
                let Some(cell) = grid.cell(line, col) else {
                    continue;
                };

                let blank = cell.is_blank();
                if blank && cell.bg == Color::Default {
                    continue;
                }

                if self.instances.len() >= self.max_instances {
                    debug!(
                        "instance cap {} reached at line {line}, col {col}",
                        self.max_instances
                    );
                    break 'lines;
                }

                let bold = cell.flags.bold;
                let variant = FontVariant::from_style(bold, cell.flags.italic);
                let glyph = if blank {
                    None
                } else {
                    atlas.get_glyph(cell.c, variant)
                };

                let (atlas_offset, atlas_size, bearing) = match glyph {
                    Some(info) => (
                        info.uv_offset,
                        info.uv_size,
                        [info.bearing[0] as i16, info.bearing[1] as i16],
                    ),
                    None => ([0.0; 2], [0.0; 2], [0; 2]),
                };

                self.instances.push(GlyphInstance {
                    position: [col as f32 * cell_w, y],
                    atlas_offset,
                    atlas_size,
                    foreground: self.color_mapper.map(cell.fg, true, bold),
                    background: self.color_mapper.map(cell.bg, false, false),
                    flags: StyleFlags::from(cell.flags).bits(),
                    bearing,
                });
            }
        }

        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::BoxRasterizer;
    use lumen_grid::{Cell, CellFlags, TerminalGrid};

    fn atlas() -> GlyphAtlas {
        let mut atlas = GlyphAtlas::new(512, 512);
        atlas.set_fonts(BoxRasterizer::new(6, 12), 1.0);
        atlas
    }

    fn metrics() -> CellMetrics {
        CellMetrics::new(8.0, 16.0, 2.0)
    }

    #[test]
    fn test_empty_grid_has_no_instances() {
        let grid = TerminalGrid::new(80, 24);
        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(1000);
        assert!(builder.build_frame(&grid, &mut atlas, metrics()).is_empty());
        assert_eq!(atlas.cached_glyph_count(), 0);
    }

    #[test]
    fn test_blank_with_background_is_drawn() {
        let mut grid = TerminalGrid::new(10, 2);
        grid.write_str(0, 0, "          ", Cell::default());
        grid.set(1, 3, Cell::new(' ').with_bg(Color::Indexed(4)));

        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(1000);
        let instances = builder.build_frame(&grid, &mut atlas, metrics());
        assert_eq!(instances.len(), 1);
        let inst = instances[0];
        assert_eq!(inst.position, [3.0 * 16.0, 32.0]);
        assert_eq!(inst.atlas_size, [0.0, 0.0]);
        assert_eq!(inst.background, [0.0, 0.0, 0.8, 1.0]);
        // Blank cells never touch the atlas.
        assert_eq!(atlas.cached_glyph_count(), 0);
    }

    #[test]
    fn test_text_instances_in_reading_order() {
        let mut grid = TerminalGrid::new(4, 2);
        grid.write_str(0, 0, "ab", Cell::default());
        grid.write_str(1, 2, "c", Cell::default().with_flags(CellFlags::BOLD));

        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(1000);
        let instances = builder.build_frame(&grid, &mut atlas, metrics());
        let positions: Vec<_> = instances.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![[0.0, 0.0], [16.0, 0.0], [32.0, 32.0]]);
        assert!(instances.iter().all(|i| i.atlas_size[0] > 0.0));
        assert_eq!(instances[2].flags, StyleFlags::BOLD.bits());
        assert_eq!(atlas.cached_glyph_count(), 3);
    }

    #[test]
    fn test_bold_brightens_foreground_only() {
        let mut grid = TerminalGrid::new(2, 1);
        let cell = Cell::new('x')
            .with_fg(Color::Indexed(1))
            .with_bg(Color::Indexed(1))
            .with_flags(CellFlags::BOLD);
        grid.set(0, 0, cell);

        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(10);
        let inst = builder.build_frame(&grid, &mut atlas, metrics())[0];
        assert_eq!(inst.foreground, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(inst.background, [0.8, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_instance_cap() {
        let mut grid = TerminalGrid::new(100, 100);
        for line in 0..100 {
            grid.write_str(line, 0, &"x".repeat(100), Cell::default());
        }
        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(20_000);
        assert_eq!(builder.build_frame(&grid, &mut atlas, metrics()).len(), 10_000);

        let mut capped = FrameBuilder::new(250);
        let instances = capped.build_frame(&grid, &mut atlas, metrics());
        assert_eq!(instances.len(), 250);
        // Cells are dropped from the end of the walk.
        assert_eq!(instances[249].position, [49.0 * 16.0, 2.0 * 32.0]);
    }

    #[test]
    fn test_missing_glyph_keeps_background() {
        let mut raster = BoxRasterizer::new(6, 12);
        raster.missing.push('\u{E0A0}');
        let mut atlas = GlyphAtlas::new(256, 256);
        atlas.set_fonts(raster, 1.0);

        let mut grid = TerminalGrid::new(3, 1);
        grid.set(0, 1, Cell::new('\u{E0A0}').with_flags(CellFlags::UNDERLINE));
        let mut builder = FrameBuilder::new(10);
        let instances = builder.build_frame(&grid, &mut atlas, metrics());
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].atlas_offset, [0.0, 0.0]);
        assert_eq!(instances[0].atlas_size, [0.0, 0.0]);
        assert_eq!(instances[0].flags, StyleFlags::UNDERLINE.bits());
    }

    #[test]
    fn test_only_visible_lines() {
        let mut grid = TerminalGrid::with_scrollback(4, 2, 3);
        grid.write_str(0, 0, "old", Cell::default());
        grid.write_str(4, 0, "new", Cell::default());

        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(100);
        let instances = builder.build_frame(&grid, &mut atlas, metrics());
        assert_eq!(instances.len(), 3);
        // Line 4 is the second screen row.
        assert!(instances.iter().all(|i| i.position[1] == 32.0));

        grid.scroll_to(0);
        let instances = builder.build_frame(&grid, &mut atlas, metrics());
        assert!(instances.iter().all(|i| i.position[1] == 0.0));
    }

    struct Flat;

    impl ColorMapper for Flat {
        fn map(&self, _color: Color, is_foreground: bool, _bold: bool) -> [f32; 4] {
            if is_foreground { [0.25; 4] } else { [0.75; 4] }
        }
    }

    #[test]
    fn test_injected_color_mapper() {
        let mut grid = TerminalGrid::new(2, 1);
        grid.set(0, 0, Cell::new('q').with_fg(Color::Rgb(1, 2, 3)));
        let mut atlas = atlas();
        let mut builder = FrameBuilder::new(10);
        builder.set_color_mapper(Flat);
        let inst = builder.build_frame(&grid, &mut atlas, metrics())[0];
        assert_eq!(inst.foreground, [0.25; 4]);
        assert_eq!(inst.background, [0.75; 4]);
    }
}
