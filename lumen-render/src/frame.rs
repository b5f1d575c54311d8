//! GPU-independent frame state.
//!
//! `FrameComposer` owns everything a frame needs except the GPU: the glyph
//! atlas, the instance builder, view settings and the dirty flag. It turns a
//! borrowed grid into a `PreparedFrame` that the renderer uploads and draws.

use std::time::Instant;

use lumen_grid::{GridSnapshot, SelectionRange};
use tracing::{trace, warn};

use crate::atlas::{DirtyRegion, GlyphAtlas, GlyphRasterizer};
use crate::clock::DirtyFlag;
use crate::color::{ColorMapper, PaletteColorMapper};
use crate::config::{CursorConfig, RendererConfig};
use crate::geometry::{CellMetrics, FrameBuilder};
use crate::gpu::{Pass, plan_passes};
use crate::overlay::{cursor_overlay, selection_rects};
use crate::stats::CacheStats;
use crate::types::{
    CursorRenderInfo, CursorStyle, GlyphInstance, OverlayUniforms, SelectionRect,
    TerminalUniforms,
};

/// Atlas texels that must reach the GPU before drawing.
#[derive(Debug, Clone, Copy)]
pub struct AtlasUpdate<'a> {
    pub region: DirtyRegion,
    /// The whole atlas store; `region` selects the part to upload.
    pub data: &'a [u8],
    pub atlas_width: u32,
}

/// Everything the GPU side needs for one frame.
#[derive(Debug)]
pub struct PreparedFrame<'a> {
    pub instances: &'a [GlyphInstance],
    pub uniforms: TerminalUniforms,
    pub overlay: OverlayUniforms,
    pub cursor: CursorRenderInfo,
    pub selection: Vec<SelectionRect>,
    pub passes: Vec<Pass>,
    pub clear_color: [f32; 4],
    pub atlas_update: Option<AtlasUpdate<'a>>,
}

pub struct FrameComposer {
    atlas: GlyphAtlas,
    builder: FrameBuilder,
    dirty: DirtyFlag,
    metrics: CellMetrics,
    /// Drawable size in physical pixels.
    viewport: (u32, u32),
    cursor: CursorConfig,
    selection: Option<SelectionRange>,
    selection_color: [f32; 4],
    clear_color: [f32; 4],
    start: Instant,
}

impl FrameComposer {
    pub fn new(config: &RendererConfig, viewport: (u32, u32), metrics: CellMetrics) -> Self {
        Self {
            atlas: GlyphAtlas::new(config.atlas_size, config.atlas_size),
            builder: FrameBuilder::new(config.max_instances),
            dirty: DirtyFlag::new(),
            metrics,
            viewport,
            cursor: config.cursor.clone(),
            selection: None,
            selection_color: config.selection_color,
            clear_color: config.clear_color,
            start: Instant::now(),
        }
    }

    /// Shared handle to the "needs display" flag.
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    pub fn set_needs_display(&self) {
        self.dirty.mark();
    }

    pub fn needs_display(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.take()
    }

    /// New drawable size in physical pixels. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            warn!("ignoring resize to {width}x{height}");
            return false;
        }
        self.viewport = (width, height);
        self.dirty.mark();
        true
    }

    /// New display scale. Glyphs are re-rasterized at the new scale.
    pub fn update_scale_factor(&mut self, scale_factor: f32) -> bool {
        if !(scale_factor.is_finite() && scale_factor > 0.0) {
            warn!("ignoring scale factor {scale_factor}");
            return false;
        }
        if scale_factor != self.metrics.scale_factor {
            self.metrics.scale_factor = scale_factor;
            self.atlas.set_scale_factor(scale_factor);
            self.atlas.invalidate();
        }
        self.dirty.mark();
        true
    }

    /// New cell size in logical pixels.
    pub fn update_cell_metrics(&mut self, width: f32, height: f32) -> bool {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            warn!("ignoring cell size {width}x{height}");
            return false;
        }
        self.metrics.width = width;
        self.metrics.height = height;
        self.dirty.mark();
        true
    }

    /// Install fonts and drop glyphs rasterized from the previous set.
    pub fn set_fonts(&mut self, rasterizer: impl GlyphRasterizer + 'static) {
        self.atlas.set_fonts(rasterizer, self.metrics.scale_factor);
        self.atlas.invalidate();
        self.dirty.mark();
    }

    pub fn set_color_mapper(&mut self, mapper: impl ColorMapper + 'static) {
        self.builder.set_color_mapper(mapper);
        self.dirty.mark();
    }

    /// Default colors and the 16 named colors. The background also becomes
    /// the clear color.
    pub fn set_theme(
        &mut self,
        foreground: [f32; 4],
        background: [f32; 4],
        palette: [[f32; 3]; 16],
    ) {
        self.builder.set_color_mapper(
            PaletteColorMapper::new()
                .with_defaults(foreground, background)
                .with_palette(palette),
        );
        self.clear_color = background;
        self.dirty.mark();
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
        self.dirty.mark();
    }

    pub fn set_selection(&mut self, selection: Option<SelectionRange>) {
        self.selection = selection;
        self.dirty.mark();
    }

    pub fn set_selection_color(&mut self, color: [f32; 4]) {
        self.selection_color = color;
        self.dirty.mark();
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle) {
        self.cursor.style = style;
        self.dirty.mark();
    }

    pub fn set_cursor_color(&mut self, color: [f32; 4]) {
        self.cursor.color = color;
        self.dirty.mark();
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor.visible = visible;
        self.dirty.mark();
    }

    pub fn set_cursor_blink(&mut self, blink: bool) {
        self.cursor.blink = blink;
        self.dirty.mark();
    }

    pub fn invalidate_glyph_cache(&mut self) {
        self.atlas.invalidate();
        self.dirty.mark();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            glyph_count: self.atlas.cached_glyph_count(),
            atlas_usage: self.atlas.usage(),
        }
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn cursor(&self) -> &CursorConfig {
        &self.cursor
    }

    /// Seconds since the composer was created.
    fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Build the instance list, uniforms and overlays for `grid`.
    ///
    /// Does not touch the dirty flag.
    pub fn prepare<G: GridSnapshot + ?Sized>(&mut self, grid: &G) -> PreparedFrame<'_> {
        let metrics = self.metrics;
        let instances = self.builder.build_frame(grid, &mut self.atlas, metrics);

        let atlas_update = self.atlas.take_dirty_region().map(|region| AtlasUpdate {
            region,
            data: self.atlas.data(),
            atlas_width: self.atlas.size().0,
        });

        let (atlas_w, atlas_h) = self.atlas.size();
        let uniforms = TerminalUniforms {
            viewport_size: [self.viewport.0 as f32, self.viewport.1 as f32],
            cell_size: metrics.physical_size(),
            atlas_size: [atlas_w as f32, atlas_h as f32],
            time: self.start.elapsed().as_secs_f32(),
            _padding: 0.0,
        };

        let cursor = cursor_overlay(grid, metrics, &self.cursor);
        let selection = self
            .selection
            .as_ref()
            .map(|range| selection_rects(grid, range, metrics))
            .unwrap_or_default();

        let overlay = OverlayUniforms {
            selection_color: self.selection_color,
            cursor_color: cursor.color,
            cursor_position: cursor.position,
            cursor_style: cursor.style as u32,
            cursor_blink: self.cursor.blink as u32,
        };

        let passes = plan_passes(instances.len(), selection.len(), &cursor);
        trace!(
            instances = instances.len(),
            selection = selection.len(),
            passes = passes.len(),
            "frame prepared"
        );

        PreparedFrame {
            instances,
            uniforms,
            overlay,
            cursor,
            selection,
            passes,
            clear_color: self.clear_color,
            atlas_update,
        }
    }
}
