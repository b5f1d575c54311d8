//! Terminal color resolution.

use lumen_grid::Color;

/// Converts an emulator color into linear RGBA for the shaders.
///
/// `bold` is only meaningful for foreground colors, where the palette mapper
/// brightens the eight base ANSI colors.
pub trait ColorMapper: Send {
    fn map(&self, color: Color, is_foreground: bool, bold: bool) -> [f32; 4];
}

/// The standard 16 ANSI colors.
pub const ANSI_PALETTE: [[f32; 3]; 16] = [
    [0.0, 0.0, 0.0], // Black
    [0.8, 0.0, 0.0], // Red
    [0.0, 0.8, 0.0], // Green
    [0.8, 0.8, 0.0], // Yellow
    [0.0, 0.0, 0.8], // Blue
    [0.8, 0.0, 0.8], // Magenta
    [0.0, 0.8, 0.8], // Cyan
    [0.8, 0.8, 0.8], // White
    [0.5, 0.5, 0.5], // Bright Black
    [1.0, 0.0, 0.0], // Bright Red
    [0.0, 1.0, 0.0], // Bright Green
    [1.0, 1.0, 0.0], // Bright Yellow
    [0.0, 0.0, 1.0], // Bright Blue
    [1.0, 0.0, 1.0], // Bright Magenta
    [0.0, 1.0, 1.0], // Bright Cyan
    [1.0, 1.0, 1.0], // Bright White
];

/// xterm-style palette: 16 themeable colors, the 6x6x6 cube and a
/// 24-step grayscale ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteColorMapper {
    foreground: [f32; 4],
    background: [f32; 4],
    palette: [[f32; 3]; 16],
}

impl Default for PaletteColorMapper {
    fn default() -> Self {
        Self {
            foreground: [1.0, 1.0, 1.0, 1.0],
            background: [0.0, 0.0, 0.0, 1.0],
            palette: ANSI_PALETTE,
        }
    }
}

impl PaletteColorMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default foreground/background.
    pub fn with_defaults(mut self, foreground: [f32; 4], background: [f32; 4]) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Override the 16 named colors. The cube and ramp are fixed.
    pub fn with_palette(mut self, palette: [[f32; 3]; 16]) -> Self {
        self.palette = palette;
        self
    }

    /// Resolve a 256-color index.
    pub fn resolve_indexed(&self, index: u8, bold: bool) -> [f32; 4] {
        match index {
            0..=15 => {
                let mut i = index as usize;
                if bold && i < 8 {
                    i += 8;
                }
                let [r, g, b] = self.palette[i];
                [r, g, b, 1.0]
            }
            16..=231 => {
                let cube = index - 16;
                let level = |c: u8| {
                    if c == 0 {
                        0.0
                    } else {
                        (55 + c as u32 * 40) as f32 / 255.0
                    }
                };
                [level(cube / 36), level((cube / 6) % 6), level(cube % 6), 1.0]
            }
            _ => {
                let gray = (8 + (index as u32 - 232) * 10) as f32 / 255.0;
                [gray, gray, gray, 1.0]
            }
        }
    }
}

impl ColorMapper for PaletteColorMapper {
    fn map(&self, color: Color, is_foreground: bool, bold: bool) -> [f32; 4] {
        match color {
            Color::Default if is_foreground => self.foreground,
            Color::Default => self.background,
            Color::DefaultInverted if is_foreground => self.background,
            Color::DefaultInverted => self.foreground,
            Color::Indexed(i) => self.resolve_indexed(i, bold),
            Color::Rgb(r, g, b) => [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn test_default_colors() {
        let mapper = PaletteColorMapper::new();
        assert_eq!(mapper.map(Color::Default, true, false), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mapper.map(Color::Default, false, false), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(mapper.map(Color::DefaultInverted, true, false), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(mapper.map(Color::DefaultInverted, false, false), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_truecolor() {
        let mapper = PaletteColorMapper::new();
        let c = mapper.map(Color::Rgb(255, 0, 51), true, false);
        assert!(approx(c, [1.0, 0.0, 0.2, 1.0]));
    }

    #[test]
    fn test_named_and_bold_remap() {
        let mapper = PaletteColorMapper::new();
        assert_eq!(mapper.resolve_indexed(1, false), [0.8, 0.0, 0.0, 1.0]);
        assert_eq!(mapper.resolve_indexed(1, true), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mapper.resolve_indexed(0, true), [0.5, 0.5, 0.5, 1.0]);
        // Already bright: unchanged.
        assert_eq!(mapper.resolve_indexed(12, true), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(mapper.resolve_indexed(15, false), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_cube_boundaries() {
        let mapper = PaletteColorMapper::new();
        assert_eq!(mapper.resolve_indexed(16, false), [0.0, 0.0, 0.0, 1.0]);
        assert!(approx(mapper.resolve_indexed(231, false), [1.0, 1.0, 1.0, 1.0]));
        // 16 + 36*1 + 6*2 + 3 = 67 -> (1, 2, 3)
        let c = mapper.resolve_indexed(67, false);
        assert!(approx(c, [95.0 / 255.0, 135.0 / 255.0, 175.0 / 255.0, 1.0]));
    }

    #[test]
    fn test_grayscale_boundaries() {
        let mapper = PaletteColorMapper::new();
        let first = 8.0 / 255.0;
        assert!(approx(mapper.resolve_indexed(232, false), [first, first, first, 1.0]));
        let g = 238.0 / 255.0;
        assert!(approx(mapper.resolve_indexed(255, false), [g, g, g, 1.0]));
    }

    #[test]
    fn test_bold_does_not_touch_extended_colors() {
        let mapper = PaletteColorMapper::new();
        assert_eq!(mapper.resolve_indexed(100, true), mapper.resolve_indexed(100, false));
        assert_eq!(mapper.resolve_indexed(240, true), mapper.resolve_indexed(240, false));
    }

    #[test]
    fn test_theme_overrides() {
        let mut palette = ANSI_PALETTE;
        palette[9] = [0.9, 0.1, 0.1];
        let mapper = PaletteColorMapper::new()
            .with_defaults([0.9, 0.9, 0.9, 1.0], [0.1, 0.1, 0.1, 1.0])
            .with_palette(palette);
        assert_eq!(mapper.map(Color::Default, false, false), [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(mapper.map(Color::Indexed(1), true, true), [0.9, 0.1, 0.1, 1.0]);
    }
}
