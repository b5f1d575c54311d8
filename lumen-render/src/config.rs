//! Renderer configuration.
//!
//! Hosts typically deserialize this from their own settings store; every
//! field has a default so partial documents are accepted.

use serde::{Deserialize, Serialize};

use crate::error::{RendererError, Result};
use crate::types::CursorStyle;

/// Maximum atlas size (8K is safe for most GPUs).
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Default number of in-flight frames (triple buffering).
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Atlas texture edge length in texels.
    pub atlas_size: u32,
    /// Upper bound on instances per frame; excess cells are dropped.
    pub max_instances: usize,
    /// Number of rotating GPU buffer slots.
    pub frames_in_flight: usize,
    /// Tick rate of the frame clock.
    pub refresh_rate_hz: f32,
    /// Surface clear color (RGBA 0-1).
    pub clear_color: [f32; 4],
    /// Selection overlay color (RGBA 0-1, normally translucent).
    pub selection_color: [f32; 4],
    pub cursor: CursorConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            atlas_size: 2048,
            max_instances: 20_000,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            refresh_rate_hz: 60.0,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            selection_color: [0.2, 0.4, 0.8, 0.4],
            cursor: CursorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub style: CursorStyle,
    pub color: [f32; 4],
    pub blink: bool,
    pub visible: bool,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            style: CursorStyle::Block,
            color: [1.0, 1.0, 1.0, 0.8],
            blink: false,
            visible: true,
        }
    }
}

impl RendererConfig {
    /// Reject values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.atlas_size == 0 || self.atlas_size > MAX_ATLAS_SIZE {
            return Err(RendererError::InvalidConfig(format!(
                "atlas_size must be in 1..={MAX_ATLAS_SIZE}, got {}",
                self.atlas_size
            )));
        }
        if self.max_instances == 0 {
            return Err(RendererError::InvalidConfig(
                "max_instances must be positive".into(),
            ));
        }
        if self.frames_in_flight < 2 {
            return Err(RendererError::InvalidConfig(format!(
                "frames_in_flight must be at least 2, got {}",
                self.frames_in_flight
            )));
        }
        if !(self.refresh_rate_hz.is_finite() && self.refresh_rate_hz > 0.0) {
            return Err(RendererError::InvalidConfig(format!(
                "refresh_rate_hz must be positive, got {}",
                self.refresh_rate_hz
            )));
        }
        Ok(())
    }
}
