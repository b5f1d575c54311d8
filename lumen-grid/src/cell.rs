//! Terminal cell representation.

use serde::{Deserialize, Serialize};

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character in this cell. `'\0'` marks a never-written cell.
    pub c: char,
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Cell attributes (bold, italic, etc.).
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            c: '\0',
            fg: Color::Default,
            bg: Color::Default,
            flags: CellFlags::default(),
        }
    }
}

impl Cell {
    /// A cell holding `c` with default colors and no attributes.
    pub fn new(c: char) -> Self {
        Self { c, ..Self::default() }
    }

    /// Builder-style foreground override.
    pub fn with_fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    /// Builder-style background override.
    pub fn with_bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    /// Builder-style attribute override.
    pub fn with_flags(mut self, flags: CellFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether the cell has no visible glyph (null or whitespace).
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.c == '\0' || self.c.is_whitespace()
    }
}

/// Cell attribute flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub dim: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub blink: bool,
}

impl CellFlags {
    pub const BOLD: Self = Self { bold: true, ..Self::NONE };
    pub const ITALIC: Self = Self { italic: true, ..Self::NONE };
    pub const UNDERLINE: Self = Self { underline: true, ..Self::NONE };

    const NONE: Self = Self {
        bold: false,
        italic: false,
        underline: false,
        strikethrough: false,
        dim: false,
        inverse: false,
        hidden: false,
        blink: false,
    };
}

/// Terminal color as stored by the emulator, before any theme is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Default foreground/background.
    #[default]
    Default,
    /// Default colors with foreground and background swapped.
    DefaultInverted,
    /// 256-color palette index (0-15 are the named ANSI colors).
    Indexed(u8),
    /// True color RGB.
    Rgb(u8, u8, u8),
}
