//! Renderer error types.
//!
//! Only initialization can fail. Per-frame problems (atlas full, surface not
//! ready, missing glyphs) are absorbed by the renderer and surface through
//! `CacheStats`/`FrameStats` and tracing events instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    #[error("pipeline creation failed: {0}")]
    Pipeline(String),

    #[error("font error: {0}")]
    Font(&'static str),

    #[error("invalid renderer config: {0}")]
    InvalidConfig(String),

    #[error("GPU resource allocation failed: {0}")]
    Allocation(String),

    #[error("failed to spawn frame clock thread: {0}")]
    ClockThread(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RendererError>;
