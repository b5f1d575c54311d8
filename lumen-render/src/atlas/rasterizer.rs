//! Glyph rasterization.
//!
//! The atlas asks a `GlyphRasterizer` for coverage bitmaps; `FontSet` is the
//! fontdue-backed implementation used in production.

use fontdue::{Font, FontSettings};

use crate::error::{RendererError, Result};
use crate::types::{FontVariant, GlyphKey};

/// A single-channel coverage bitmap positioned relative to its cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    /// Offset from the cell's left edge to the bitmap's left edge.
    pub left: i32,
    /// Offset from the cell's top edge to the bitmap's top edge.
    pub top: i32,
    pub advance: f32,
    /// `width * height` coverage values, row-major.
    pub coverage: Vec<u8>,
}

/// Produces glyph bitmaps at a given display scale.
pub trait GlyphRasterizer: Send {
    /// Rasterize `key` at `scale_factor`. Returns `None` if the face has no
    /// glyph for the character.
    fn rasterize(&self, key: GlyphKey, scale_factor: f32) -> Option<RasterizedGlyph>;
}

/// Four font faces (normal, bold, italic, bold-italic) at one point size.
pub struct FontSet {
    faces: [Font; 4],
    size_px: f32,
}

impl FontSet {
    /// Parse four faces from raw font bytes.
    pub fn from_bytes(
        normal: &[u8],
        bold: &[u8],
        italic: &[u8],
        bold_italic: &[u8],
        size_px: f32,
    ) -> Result<Self> {
        let parse = |bytes: &[u8]| {
            Font::from_bytes(bytes, FontSettings::default()).map_err(RendererError::Font)
        };
        Ok(Self {
            faces: [parse(normal)?, parse(bold)?, parse(italic)?, parse(bold_italic)?],
            size_px,
        })
    }

    /// Use one face for every variant.
    pub fn uniform(font: Font, size_px: f32) -> Self {
        Self {
            faces: [font.clone(), font.clone(), font.clone(), font],
            size_px,
        }
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub fn face(&self, variant: FontVariant) -> &Font {
        &self.faces[variant.index()]
    }

    /// Cell size in logical pixels: the advance of 'M' and the line height
    /// of the normal face.
    pub fn cell_metrics(&self) -> (f32, f32) {
        let font = self.face(FontVariant::Normal);
        let advance = font.metrics('M', self.size_px).advance_width;
        let line = font
            .horizontal_line_metrics(self.size_px)
            .map_or(self.size_px * 1.2, |m| m.new_line_size);
        (advance.ceil(), line.ceil())
    }
}

impl GlyphRasterizer for FontSet {
    fn rasterize(&self, key: GlyphKey, scale_factor: f32) -> Option<RasterizedGlyph> {
        let font = self.face(key.variant);
        if font.lookup_glyph_index(key.character) == 0 {
            return None;
        }

        let px = self.size_px * scale_factor;
        let (metrics, coverage) = font.rasterize(key.character, px);
        let ascent = font.horizontal_line_metrics(px).map_or(px, |m| m.ascent);
        // fontdue's ymin is the bitmap bottom relative to the baseline.
        let top = (ascent - (metrics.ymin as f32 + metrics.height as f32)).round() as i32;

        Some(RasterizedGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            left: metrics.xmin,
            top,
            advance: metrics.advance_width,
            coverage,
        })
    }
}

/// Solid rectangles of a fixed logical size, for tests.
#[cfg(test)]
pub(crate) struct BoxRasterizer {
    pub width: u32,
    pub height: u32,
    /// Characters reported as absent from the font.
    pub missing: Vec<char>,
}

#[cfg(test)]
impl BoxRasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            missing: Vec::new(),
        }
    }
}

#[cfg(test)]
impl GlyphRasterizer for BoxRasterizer {
    fn rasterize(&self, key: GlyphKey, scale_factor: f32) -> Option<RasterizedGlyph> {
        if self.missing.contains(&key.character) {
            return None;
        }
        let width = (self.width as f32 * scale_factor).ceil() as u32;
        let height = (self.height as f32 * scale_factor).ceil() as u32;
        Some(RasterizedGlyph {
            width,
            height,
            left: 0,
            top: 0,
            advance: width as f32,
            coverage: vec![255; (width * height) as usize],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO: &[u8] = include_bytes!("../../fonts/DejaVuSansMono.ttf");

    fn mono(size_px: f32) -> FontSet {
        FontSet::from_bytes(MONO, MONO, MONO, MONO, size_px).unwrap()
    }

    fn ascent(fonts: &FontSet, px: f32) -> f32 {
        fonts
            .face(FontVariant::Normal)
            .horizontal_line_metrics(px)
            .unwrap()
            .ascent
    }

    #[test]
    fn test_capital_sits_on_baseline() {
        let fonts = mono(16.0);
        let glyph = fonts
            .rasterize(GlyphKey::new('M', FontVariant::Normal), 1.0)
            .unwrap();
        assert!(glyph.width > 0 && glyph.height > 0);
        assert_eq!(glyph.coverage.len(), (glyph.width * glyph.height) as usize);
        assert!(glyph.coverage.iter().any(|&c| c > 200));

        let bottom = glyph.top + glyph.height as i32;
        assert!(glyph.top > 0);
        assert!((bottom as f32 - ascent(&fonts, 16.0)).abs() <= 1.0);
    }

    #[test]
    fn test_descender_extends_below_baseline() {
        let fonts = mono(16.0);
        let glyph = fonts
            .rasterize(GlyphKey::new('g', FontVariant::Normal), 1.0)
            .unwrap();
        let bottom = glyph.top + glyph.height as i32;
        assert!(bottom as f32 > ascent(&fonts, 16.0) + 1.0);
    }

    #[test]
    fn test_missing_character() {
        let fonts = mono(16.0);
        let key = GlyphKey::new('\u{10FFFD}', FontVariant::Bold);
        assert!(fonts.rasterize(key, 1.0).is_none());
    }

    #[test]
    fn test_scale_factor_grows_bitmap() {
        let fonts = mono(16.0);
        let key = GlyphKey::new('M', FontVariant::Normal);
        let single = fonts.rasterize(key, 1.0).unwrap();
        let double = fonts.rasterize(key, 2.0).unwrap();
        let expected = single.height * 2;
        assert!((expected - 2..=expected + 2).contains(&double.height));
        assert!(double.advance > single.advance * 1.9);
    }

    #[test]
    fn test_monospace_cell_metrics() {
        let fonts = mono(16.0);
        let (width, height) = fonts.cell_metrics();
        // 1233/2048 em advance at 16px
        assert_eq!(width, 10.0);
        assert!((18.0..=20.0).contains(&height));

        let face = fonts.face(FontVariant::Normal);
        let advance = |c| face.metrics(c, 16.0).advance_width;
        assert_eq!(advance('i'), advance('W'));
    }

    #[test]
    fn test_uniform_uses_one_face() {
        let font = Font::from_bytes(MONO, FontSettings::default()).unwrap();
        let fonts = FontSet::uniform(font, 14.0);
        assert_eq!(fonts.size_px(), 14.0);

        let normal = fonts.rasterize(GlyphKey::new('A', FontVariant::Normal), 1.0);
        let bold = fonts.rasterize(GlyphKey::new('A', FontVariant::BoldItalic), 1.0);
        assert!(normal.is_some());
        assert_eq!(normal, bold);
    }

    #[test]
    fn test_invalid_font_bytes() {
        let result = FontSet::from_bytes(b"nope", b"nope", b"nope", b"nope", 14.0);
        assert!(matches!(result, Err(RendererError::Font(_))));
    }

    #[test]
    fn test_box_rasterizer_scales() {
        let raster = BoxRasterizer::new(16, 24);
        let glyph = raster
            .rasterize(GlyphKey::new('A', FontVariant::Normal), 2.0)
            .unwrap();
        assert_eq!((glyph.width, glyph.height), (32, 48));
        assert_eq!(glyph.coverage.len(), 32 * 48);
    }
}
