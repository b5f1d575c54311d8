//! Glyph atlas for GPU terminal rendering.
//!
//! Glyphs are rasterized lazily on first use and shelf-packed into a
//! single-channel coverage store that mirrors the GPU texture. The renderer
//! uploads only the region touched since the last upload.
//!
//! The atlas never evicts: once full, further misses return `None` until
//! `invalidate()` starts over.

mod rasterizer;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::types::{FontVariant, GlyphInfo, GlyphKey};

pub use rasterizer::{FontSet, GlyphRasterizer, RasterizedGlyph};

#[cfg(test)]
pub(crate) use rasterizer::BoxRasterizer;

/// Gap between packed glyphs.
const PADDING: u32 = 2;
/// Empty border added around every bitmap (split evenly between sides).
const MARGIN: u32 = 4;
/// Smallest packed bitmap edge.
const MIN_GLYPH_SIZE: u32 = 4;

const ASCII_SLOTS: usize = 128;
/// Bound on remembered misses. Keys past it are retried on every lookup.
const MAX_MISSES: usize = 4096;

/// Pixel rect written since the last upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Shelf-packing cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Shelf {
    x: u32,
    y: u32,
    row_height: u32,
}

pub struct GlyphAtlas {
    width: u32,
    height: u32,
    /// Coverage texels (R8), row-major.
    data: Vec<u8>,
    glyphs: HashMap<GlyphKey, GlyphInfo>,
    /// O(1) lookup for ASCII, one block of 128 per font variant.
    ascii: Vec<Option<GlyphInfo>>,
    /// Keys that failed to rasterize or pack; retried after `set_fonts` or `invalidate`.
    misses: HashSet<GlyphKey>,
    shelf: Shelf,
    /// (min_x, min_y, max_x, max_y) of pending texels.
    dirty: Option<(u32, u32, u32, u32)>,
    generation: u32,
    rasterizer: Option<Box<dyn GlyphRasterizer>>,
    scale_factor: f32,
}

impl GlyphAtlas {
    /// Create an empty atlas. Both dimensions must be positive.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
            glyphs: HashMap::new(),
            ascii: vec![None; ASCII_SLOTS * FontVariant::ALL.len()],
            misses: HashSet::new(),
            shelf: Shelf::default(),
            dirty: None,
            generation: 0,
            rasterizer: None,
            scale_factor: 1.0,
        }
    }

    /// Get or create the atlas entry for `ch` in `variant`.
    ///
    /// Returns `None` when no fonts are installed, the font lacks the glyph,
    /// or the atlas has no room left.
    #[inline]
    pub fn get_glyph(&mut self, ch: char, variant: FontVariant) -> Option<GlyphInfo> {
        // Fast path: ASCII
        if (ch as u32) < ASCII_SLOTS as u32 {
            if let Some(info) = self.ascii[ascii_slot(ch, variant)] {
                return Some(info);
            }
        }

        let key = GlyphKey::new(ch, variant);
        if let Some(info) = self.glyphs.get(&key) {
            return Some(*info);
        }
        if self.misses.contains(&key) {
            return None;
        }

        let info = self.rasterize_and_pack(key);
        match info {
            Some(info) => {
                if (ch as u32) < ASCII_SLOTS as u32 {
                    self.ascii[ascii_slot(ch, variant)] = Some(info);
                }
                self.glyphs.insert(key, info);
            }
            None => {
                if self.misses.len() < MAX_MISSES {
                    self.misses.insert(key);
                }
            }
        }
        info
    }

    fn rasterize_and_pack(&mut self, key: GlyphKey) -> Option<GlyphInfo> {
        let rasterizer = self.rasterizer.as_ref()?;
        let Some(glyph) = rasterizer.rasterize(key, self.scale_factor) else {
            debug!("no glyph for {:?} in {:?} face", key.character, key.variant);
            return None;
        };

        let packed_w = (glyph.width + MARGIN).max(MIN_GLYPH_SIZE);
        let packed_h = (glyph.height + MARGIN).max(MIN_GLYPH_SIZE);

        let Some((x, y, shelf)) = self.place(packed_w, packed_h) else {
            debug!(
                "glyph atlas full ({} glyphs, {:.1}% used), dropping {:?}",
                self.glyphs.len(),
                self.usage() * 100.0,
                key.character
            );
            return None;
        };
        self.shelf = shelf;

        // Copy coverage into the atlas, inset by half the margin.
        let inset = MARGIN / 2;
        let src_w = glyph.width as usize;
        for row in 0..glyph.height as usize {
            let src = &glyph.coverage[row * src_w..(row + 1) * src_w];
            let dst_start = (y + inset) as usize * self.width as usize
                + row * self.width as usize
                + (x + inset) as usize;
            self.data[dst_start..dst_start + src_w].copy_from_slice(src);
        }
        self.mark_dirty(x, y, x + packed_w, y + packed_h);

        let inv_w = 1.0 / self.width as f32;
        let inv_h = 1.0 / self.height as f32;
        Some(GlyphInfo {
            uv_offset: [x as f32 * inv_w, y as f32 * inv_h],
            uv_size: [packed_w as f32 * inv_w, packed_h as f32 * inv_h],
            bearing: [
                (glyph.left - inset as i32) as f32,
                (glyph.top - inset as i32) as f32,
            ],
            advance: glyph.advance,
            pixel_size: [packed_w as f32, packed_h as f32],
        })
    }

    /// Find space for a `w`x`h` bitmap. Returns the position and the shelf
    /// state after placing it; `self.shelf` is untouched on failure.
    fn place(&self, w: u32, h: u32) -> Option<(u32, u32, Shelf)> {
        if w > self.width {
            return None;
        }

        let mut shelf = self.shelf;
        // Move to next row
        if shelf.x + w > self.width {
            shelf.x = 0;
            shelf.y += shelf.row_height + PADDING;
            shelf.row_height = 0;
        }
        if shelf.y + h > self.height {
            return None;
        }

        let (x, y) = (shelf.x, shelf.y);
        shelf.x += w + PADDING;
        shelf.row_height = shelf.row_height.max(h);
        Some((x, y, shelf))
    }

    fn mark_dirty(&mut self, min_x: u32, min_y: u32, max_x: u32, max_y: u32) {
        let max_x = max_x.min(self.width);
        let max_y = max_y.min(self.height);
        self.dirty = Some(match self.dirty {
            Some((ox, oy, ow, oh)) => (ox.min(min_x), oy.min(min_y), ow.max(max_x), oh.max(max_y)),
            None => (min_x, min_y, max_x, max_y),
        });
    }

    /// Install a new font set. Cached entries are kept; previous misses are retried.
    pub fn set_fonts(&mut self, rasterizer: impl GlyphRasterizer + 'static, scale_factor: f32) {
        self.rasterizer = Some(Box::new(rasterizer));
        self.scale_factor = scale_factor;
        self.misses.clear();
    }

    /// Change the rasterization scale. Existing entries stay until `invalidate()`.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
    }

    /// Drop every cached glyph and zero the store.
    pub fn invalidate(&mut self) {
        self.glyphs.clear();
        self.ascii.fill(None);
        self.misses.clear();
        self.data.fill(0);
        self.shelf = Shelf::default();
        self.generation = self.generation.wrapping_add(1);
        // Full atlas is dirty after clear
        self.dirty = Some((0, 0, self.width, self.height));
        debug!("glyph atlas invalidated (generation {})", self.generation);
    }

    /// Fraction of the atlas consumed by the packing cursor.
    pub fn usage(&self) -> f32 {
        let used = self.shelf.y as f64 * self.width as f64
            + self.shelf.x as f64 * self.shelf.row_height as f64;
        (used / (self.width as f64 * self.height as f64)) as f32
    }

    pub fn cached_glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Take the dirty region (returns `None` if clean, resets to clean).
    pub fn take_dirty_region(&mut self) -> Option<DirtyRegion> {
        self.dirty.take().map(|(min_x, min_y, max_x, max_y)| DirtyRegion {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    /// Coverage texels, `width * height` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Incremented on every `invalidate()`.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }
}

#[inline]
fn ascii_slot(ch: char, variant: FontVariant) -> usize {
    variant.index() * ASCII_SLOTS + ch as usize
}
