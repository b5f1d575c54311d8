//! wgpu plumbing: device setup, pipelines and GPU-side resources.

mod context;
mod pipeline;
mod resources;

pub use context::GpuContext;
pub use pipeline::{DrawCounts, Pass, RenderPipeline, plan_passes};
pub use resources::{AtlasTexture, FrameSlot};
