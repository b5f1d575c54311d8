//! Lumen Render - GPU renderer for terminal grids.
//!
//! Turns a [`GridSnapshot`](lumen_grid::GridSnapshot) into instanced draw
//! calls each frame. Glyphs are rasterized on demand into a shelf-packed
//! atlas, instances rotate through a small ring of GPU buffers, and five
//! passes draw backgrounds, selection, text, decorations and the cursor.
//!
//! # Architecture
//!
//! - [`FrameComposer`] does all per-frame CPU work and needs no device. It
//!   owns the glyph atlas, the instance builder and the dirty flag.
//! - [`TerminalRenderer`] wraps the composer with a wgpu device, pipelines
//!   and a presentation target (window surface or offscreen texture).
//! - [`FrameClock`] ticks on its own thread and hands frame requests to the
//!   render thread over a bounded channel while the [`DirtyFlag`] is set.

pub mod atlas;
pub mod clock;
pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gpu;
pub mod overlay;
pub mod renderer;
pub mod ring;
pub mod stats;
pub mod types;

pub use atlas::{DirtyRegion, FontSet, GlyphAtlas, GlyphRasterizer, RasterizedGlyph};
pub use clock::{DirtyFlag, FrameClock, FrameTick};
pub use color::{ANSI_PALETTE, ColorMapper, PaletteColorMapper};
pub use config::{CursorConfig, RendererConfig};
pub use error::{RendererError, Result};
pub use frame::{FrameComposer, PreparedFrame};
pub use geometry::{CellMetrics, FrameBuilder};
pub use gpu::Pass;
pub use renderer::{OFFSCREEN_FORMAT, TerminalRenderer};
pub use ring::BufferRing;
pub use stats::{CacheStats, FrameOutcome, FrameStats};
pub use types::{
    CursorRenderInfo, CursorStyle, FontVariant, GlyphInfo, GlyphInstance, GlyphKey, SelectionRect,
    StyleFlags,
};

pub use lumen_grid;
