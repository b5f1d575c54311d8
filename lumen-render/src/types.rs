//! Data shared between the CPU frame builder and the shaders.
//!
//! Every `#[repr(C)]` struct here is uploaded verbatim and must match the
//! WGSL declarations in `gpu/shaders/terminal.wgsl`.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Font variant index used to pick one of the four font faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontVariant {
    Normal = 0,
    Bold = 1,
    Italic = 2,
    BoldItalic = 3,
}

impl FontVariant {
    pub const ALL: [FontVariant; 4] = [
        FontVariant::Normal,
        FontVariant::Bold,
        FontVariant::Italic,
        FontVariant::BoldItalic,
    ];

    /// Resolve the variant from bold/italic attribute bits.
    #[inline]
    pub fn from_style(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => FontVariant::BoldItalic,
            (true, false) => FontVariant::Bold,
            (false, true) => FontVariant::Italic,
            (false, false) => FontVariant::Normal,
        }
    }

    /// Variant for a raw index. Out-of-range indices yield `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Glyph cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub character: char,
    pub variant: FontVariant,
}

impl GlyphKey {
    pub fn new(character: char, variant: FontVariant) -> Self {
        Self { character, variant }
    }
}

/// Where a glyph lives in the atlas and how to place it in a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    /// Top-left UV in the atlas (normalized 0-1).
    pub uv_offset: [f32; 2],
    /// UV extent in the atlas (normalized 0-1).
    pub uv_size: [f32; 2],
    /// Pixel offset of the packed bitmap's top-left from the cell's top-left.
    pub bearing: [f32; 2],
    /// Horizontal advance in pixels.
    pub advance: f32,
    /// Packed bitmap size in pixels (including margin).
    pub pixel_size: [f32; 2],
}

bitflags! {
    /// Per-cell style bits consumed by the shaders.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u32 {
        const UNDERLINE = 1 << 0;
        const STRIKETHROUGH = 1 << 1;
        const INVERSE = 1 << 2;
        /// Hidden on the off phase of the blink cycle.
        const BLINK = 1 << 3;
        const BOLD = 1 << 4;
        const ITALIC = 1 << 5;
        /// Foreground drawn at half intensity.
        const DIM = 1 << 6;
        /// Nothing but the background is drawn.
        const HIDDEN = 1 << 7;
    }
}

impl From<lumen_grid::CellFlags> for StyleFlags {
    fn from(flags: lumen_grid::CellFlags) -> Self {
        let mut out = StyleFlags::empty();
        out.set(StyleFlags::UNDERLINE, flags.underline);
        out.set(StyleFlags::STRIKETHROUGH, flags.strikethrough);
        out.set(StyleFlags::INVERSE, flags.inverse);
        out.set(StyleFlags::BLINK, flags.blink);
        out.set(StyleFlags::BOLD, flags.bold);
        out.set(StyleFlags::ITALIC, flags.italic);
        out.set(StyleFlags::DIM, flags.dim);
        out.set(StyleFlags::HIDDEN, flags.hidden);
        out
    }
}

/// Instance data for one cell (64 bytes).
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GlyphInstance {
    /// Cell top-left in physical pixels.
    pub position: [f32; 2], // 8 bytes
    /// Atlas UV top-left (normalized 0-1).
    pub atlas_offset: [f32; 2], // 8 bytes
    /// Atlas UV size (normalized 0-1). Zero means no glyph.
    pub atlas_size: [f32; 2], // 8 bytes
    /// Foreground RGBA (0-1).
    pub foreground: [f32; 4], // 16 bytes
    /// Background RGBA (0-1).
    pub background: [f32; 4], // 16 bytes
    /// `StyleFlags` bits.
    pub flags: u32, // 4 bytes
    /// Glyph bitmap offset inside the cell, whole pixels.
    pub bearing: [i16; 2], // 4 bytes
}
// Total: 64 bytes

const _: () = assert!(std::mem::size_of::<GlyphInstance>() == 64);

/// Per-frame uniforms shared by every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct TerminalUniforms {
    /// Drawable size in physical pixels.
    pub viewport_size: [f32; 2], // 8 bytes
    /// Cell size in physical pixels.
    pub cell_size: [f32; 2], // 8 bytes
    /// Atlas texture size in texels.
    pub atlas_size: [f32; 2], // 8 bytes
    /// Seconds since the renderer started (drives blinking).
    pub time: f32, // 4 bytes
    pub _padding: f32, // 4 bytes
}
// Total: 32 bytes

const _: () = assert!(std::mem::size_of::<TerminalUniforms>() == 32);

/// Selection and cursor parameters for the overlay passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct OverlayUniforms {
    pub selection_color: [f32; 4], // 16 bytes
    pub cursor_color: [f32; 4], // 16 bytes
    pub cursor_position: [f32; 2], // 8 bytes
    pub cursor_style: u32, // 4 bytes
    pub cursor_blink: u32, // 4 bytes
}
// Total: 48 bytes

const _: () = assert!(std::mem::size_of::<OverlayUniforms>() == 48);

/// Cursor shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorStyle {
    #[default]
    Block = 0,
    Underline = 1,
    Bar = 2,
}

/// Cursor overlay for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorRenderInfo {
    /// Cell top-left in physical pixels.
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub style: CursorStyle,
    pub visible: bool,
}

/// A selection rectangle in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SelectionRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_grid::CellFlags;

    #[test]
    fn test_variant_from_style() {
        assert_eq!(FontVariant::from_style(false, false), FontVariant::Normal);
        assert_eq!(FontVariant::from_style(true, false), FontVariant::Bold);
        assert_eq!(FontVariant::from_style(false, true), FontVariant::Italic);
        assert_eq!(FontVariant::from_style(true, true), FontVariant::BoldItalic);
    }

    #[test]
    fn test_variant_from_index_rejects_out_of_range() {
        assert_eq!(FontVariant::from_index(3), Some(FontVariant::BoldItalic));
        assert_eq!(FontVariant::from_index(4), None);
        assert_eq!(FontVariant::from_index(usize::MAX), None);
    }

    #[test]
    fn test_style_flags_from_cell_flags() {
        let flags = CellFlags {
            underline: true,
            hidden: true,
            bold: true,
            ..CellFlags::default()
        };
        let style = StyleFlags::from(flags);
        assert_eq!(style.bits(), (1 << 0) | (1 << 7) | (1 << 4));
        assert!(style.contains(StyleFlags::UNDERLINE | StyleFlags::HIDDEN));
        assert!(!style.contains(StyleFlags::ITALIC));
    }

    #[test]
    fn test_style_bits_match_shader_constants() {
        // FLAG_* constants in terminal.wgsl
        assert_eq!(StyleFlags::UNDERLINE.bits(), 1);
        assert_eq!(StyleFlags::STRIKETHROUGH.bits(), 2);
        assert_eq!(StyleFlags::INVERSE.bits(), 4);
        assert_eq!(StyleFlags::BLINK.bits(), 8);
        assert_eq!(StyleFlags::DIM.bits(), 64);
        assert_eq!(StyleFlags::HIDDEN.bits(), 128);
        assert_eq!(StyleFlags::all().bits(), 0xFF);
        assert_eq!(StyleFlags::from(CellFlags::default()), StyleFlags::empty());
    }

    #[test]
    fn test_instance_byte_layout() {
        let instance = GlyphInstance {
            position: [1.0, 2.0],
            atlas_offset: [0.0; 2],
            atlas_size: [0.0; 2],
            foreground: [1.0; 4],
            background: [0.0; 4],
            flags: 0xAB,
            bearing: [-1, 3],
        };
        let bytes = bytemuck::bytes_of(&instance);
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[56..60], &0xABu32.to_ne_bytes());
    }
}
